use super::{json_pretty, load_config, EXIT_FAILURE, EXIT_SUCCESS};
use crate::render::classified_line;
use aptward_catalog::{ClassifiedError, ClassifiedReport, ErrorCatalog};
use std::io::Read;
use std::path::Path;

pub fn run(config: Option<&Path>, file: Option<&Path>, all: bool, json: bool) -> Result<u8, String> {
    load_config(config)?;
    let text = read_input(file)?;
    let found = classify_text(ErrorCatalog::builtin(), &text, all);

    if json {
        let reports: Vec<ClassifiedReport> = found.iter().map(ClassifiedError::report).collect();
        if all {
            println!("{}", json_pretty(&reports)?);
        } else {
            println!("{}", json_pretty(&reports.first())?);
        }
    } else if found.is_empty() {
        println!("no known diagnostic found");
    } else {
        for err in &found {
            println!("{}", classified_line(err));
        }
    }

    Ok(if found.is_empty() {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

fn classify_text(catalog: &ErrorCatalog, text: &str, all: bool) -> Vec<ClassifiedError> {
    if all {
        catalog.match_all(text.lines())
    } else {
        catalog.classify(text).into_iter().collect()
    }
}

fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(text)
        }
    }
}
