//! Csv step - stringify rows to CSV text or parse CSV text into rows
//!
//! Handles the quoted-field subset of RFC 4180: fields containing the
//! delimiter, quotes or newlines are quoted, and embedded quotes are
//! doubled.

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::{require_string, value_to_string};
use crate::core::model::{kind, CsvStepModel};
use crate::core::name::Name;
use serde_json::Value;

pub type CsvStepController = FnStepController<CsvRunner>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvAction {
    #[default]
    Stringify,
    Parse,
}

impl CsvAction {
    fn parse(action: &str) -> Result<Self, StepError> {
        match action {
            "stringify" => Ok(CsvAction::Stringify),
            "parse" => Ok(CsvAction::Parse),
            other => Err(StepError::UnknownAction {
                kind: "csv",
                action: other.to_string(),
            }),
        }
    }
}

pub struct CsvRunner {
    model: CsvStepModel,
}

impl CsvRunner {
    pub fn new(model: CsvStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for CsvRunner {
    type Compiled = (CsvAction, Value);

    fn kind(&self) -> &'static str {
        kind::CSV
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        let action = match &self.model.action {
            Some(template) => {
                CsvAction::parse(&require_string(context.compile(template), "csv action")?)?
            }
            None => CsvAction::default(),
        };
        Ok((action, context.compile(&self.model.input)))
    }

    fn run(&self, (action, input): Self::Compiled) -> RunOutcome {
        let result = match action {
            CsvAction::Stringify => stringify(&input).map(Value::String),
            CsvAction::Parse => require_string(input, "csv input").and_then(|text| {
                parse(&text).map(|rows| {
                    Value::Array(
                        rows.into_iter()
                            .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                            .collect(),
                    )
                })
            }),
        };
        RunOutcome::Ready(result)
    }
}

fn stringify(input: &Value) -> Result<String, StepError> {
    let rows = input.as_array().ok_or(StepError::Shape {
        what: "csv input".to_string(),
        expected: "array of rows",
        got: "non-array".to_string(),
    })?;
    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row.as_array().ok_or(StepError::Shape {
            what: "csv row".to_string(),
            expected: "array of cells",
            got: "non-array".to_string(),
        })?;
        let line: Vec<String> = cells
            .iter()
            .map(|cell| quote(&value_to_string(cell)))
            .collect();
        lines.push(line.join(","));
    }
    Ok(lines.join("\n"))
}

fn quote(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn parse(text: &str) -> Result<Vec<Vec<String>>, StepError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if quoted {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => quoted = false,
                other => cell.push(other),
            }
        } else {
            match ch {
                '"' if cell.is_empty() => quoted = true,
                ',' => row.push(std::mem::take(&mut cell)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    row.push(std::mem::take(&mut cell));
                    rows.push(std::mem::take(&mut row));
                }
                other => cell.push(other),
            }
        }
    }
    if quoted {
        return Err(StepError::Csv("unterminated quoted field".to_string()));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }
    Ok(rows)
}
