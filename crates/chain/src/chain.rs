// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process chain wire format.
//!
//! Two layouts are accepted: a `list` of step objects, and the legacy layout
//! where steps sit under numeric keys next to `version`. Inputs and outputs
//! may be given as a `{param: value}` map or as a list of `{param, value}`
//! pairs.

use crate::error::ValidationError;
use crate::export::ExportDescr;
use crate::import::ImportDescr;
use serde_json::{Map, Value};

/// A parsed, not yet validated, process chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessChain {
    pub version: String,
    /// Steps in declaration order
    pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDef {
    pub id: String,
    pub call: StepCall,
}

/// What a step invokes.
#[derive(Debug, Clone, PartialEq)]
pub enum StepCall {
    /// A tool module taking `param=value` arguments
    Module {
        module: String,
        inputs: Vec<InputDef>,
        outputs: Vec<OutputDef>,
        flags: String,
        overwrite: bool,
        verbose: bool,
    },
    /// A plain executable with a raw argument list
    Exec { exe: String, params: Vec<String> },
}

impl StepCall {
    /// Name checked against the accessible-module list.
    pub fn program(&self) -> &str {
        match self {
            StepCall::Module { module, .. } => module,
            StepCall::Exec { exe, .. } => exe,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputDef {
    pub param: String,
    pub value: String,
    pub import: Option<ImportDescr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputDef {
    pub param: String,
    pub value: String,
    pub export: Option<ExportDescr>,
}

impl ProcessChain {
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::Malformed("expected a JSON object".into()))?;

        let version = obj
            .get("version")
            .and_then(scalar_to_string)
            .ok_or_else(|| ValidationError::Malformed("missing 'version'".into()))?;

        let steps = match obj.get("list") {
            Some(Value::Array(items)) => parse_list_steps(items)?,
            Some(_) => return Err(ValidationError::Malformed("'list' must be an array".into())),
            None => parse_legacy_steps(obj)?,
        };

        Ok(Self { version, steps })
    }
}

fn parse_list_steps(items: &[Value]) -> Result<Vec<StepDef>, ValidationError> {
    let mut steps = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let step = item.as_object().ok_or_else(|| {
            ValidationError::Malformed(format!("list entry {} is not an object", idx))
        })?;
        let id = step
            .get("id")
            .and_then(scalar_to_string)
            .ok_or_else(|| ValidationError::MissingKey { step: format!("#{}", idx + 1), key: "id" })?;
        steps.push(parse_step(id, step)?);
    }
    Ok(steps)
}

/// Steps keyed by their position number, ordered numerically.
fn parse_legacy_steps(obj: &Map<String, Value>) -> Result<Vec<StepDef>, ValidationError> {
    let mut keyed = Vec::new();
    for (key, value) in obj {
        if key == "version" {
            continue;
        }
        let position: u64 = key
            .parse()
            .map_err(|_| ValidationError::Malformed(format!("unexpected key '{}'", key)))?;
        let step = value
            .as_object()
            .ok_or_else(|| ValidationError::step(key, "step must be an object"))?;
        keyed.push((position, key, step));
    }
    keyed.sort_by_key(|(position, _, _)| *position);

    let mut steps = Vec::with_capacity(keyed.len());
    for (_, key, step) in keyed {
        let id = step.get("id").and_then(scalar_to_string).unwrap_or_else(|| key.clone());
        steps.push(parse_step(id, step)?);
    }
    Ok(steps)
}

fn parse_step(id: String, step: &Map<String, Value>) -> Result<StepDef, ValidationError> {
    let module = step.get("module").map(|v| expect_str(&id, "module", v)).transpose()?;
    let exe = step.get("exe").map(|v| expect_str(&id, "exe", v)).transpose()?;

    let call = match (module, exe) {
        (Some(_), Some(_)) => {
            return Err(ValidationError::step(&id, "'module' and 'exe' are mutually exclusive"));
        }
        (None, None) => return Err(ValidationError::MissingKey { step: id, key: "module" }),
        (None, Some(exe)) => {
            let params = match step.get("params") {
                None => Vec::new(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(scalar_to_string)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| ValidationError::step(&id, "'params' must hold scalars"))?,
                Some(_) => return Err(ValidationError::step(&id, "'params' must be an array")),
            };
            StepCall::Exec { exe, params }
        }
        (Some(module), None) => {
            let flags = match step.get("flags") {
                None | Some(Value::Null) => String::new(),
                Some(v) => v
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ValidationError::step(&id, "'flags' must be a string"))?,
            };
            if !flags.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ValidationError::step(&id, format!("invalid flags '{}'", flags)));
            }
            StepCall::Module {
                module,
                inputs: parse_inputs(&id, step.get("inputs"))?,
                outputs: parse_outputs(&id, step.get("outputs"))?,
                flags,
                overwrite: expect_bool(&id, "overwrite", step.get("overwrite"))?,
                verbose: expect_bool(&id, "verbose", step.get("verbose"))?,
            }
        }
    };

    Ok(StepDef { id, call })
}

/// One `param`/`value` entry with its optional nested descriptor object.
struct RawParam<'a> {
    param: String,
    value: Option<String>,
    descr: Option<&'a Value>,
    /// Entry came from the `{param: value}` map layout
    from_map: bool,
}

fn parse_params<'a>(
    step: &str,
    section: &str,
    descr_key: &str,
    raw: Option<&'a Value>,
) -> Result<Vec<RawParam<'a>>, ValidationError> {
    let mut params = Vec::new();
    match raw {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (param, v) in map {
                let entry = match v {
                    Value::Object(entry) => RawParam {
                        param: param.clone(),
                        value: entry
                            .get("value")
                            .or_else(|| entry.get("name"))
                            .and_then(scalar_to_string),
                        descr: entry.get(descr_key),
                        from_map: true,
                    },
                    Value::Array(items) => {
                        let joined = items
                            .iter()
                            .map(scalar_to_string)
                            .collect::<Option<Vec<_>>>()
                            .map(|parts| parts.join(","));
                        RawParam {
                            param: param.clone(),
                            value: Some(joined.ok_or_else(|| {
                                ValidationError::step(
                                    step,
                                    format!("{} '{}' has a non-scalar list", section, param),
                                )
                            })?),
                            descr: None,
                            from_map: true,
                        }
                    }
                    other => RawParam {
                        param: param.clone(),
                        value: Some(scalar_to_string(other).ok_or_else(|| {
                            ValidationError::step(step, format!("{} '{}' has no value", section, param))
                        })?),
                        descr: None,
                        from_map: true,
                    },
                };
                params.push(entry);
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let entry = item.as_object().ok_or_else(|| {
                    ValidationError::step(step, format!("{} entries must be objects", section))
                })?;
                let param = entry
                    .get("param")
                    .and_then(Value::as_str)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| {
                        ValidationError::step(step, format!("{} entry without 'param'", section))
                    })?;
                params.push(RawParam {
                    param: param.to_string(),
                    value: entry.get("value").and_then(scalar_to_string),
                    descr: entry.get(descr_key),
                    from_map: false,
                });
            }
        }
        Some(_) => {
            return Err(ValidationError::step(step, format!("'{}' must be a map or a list", section)));
        }
    }
    Ok(params)
}

fn parse_inputs(step: &str, raw: Option<&Value>) -> Result<Vec<InputDef>, ValidationError> {
    let mut inputs = Vec::new();
    for p in parse_params(step, "inputs", "import_descr", raw)? {
        let import = match p.descr {
            Some(d) => Some(serde_json::from_value::<ImportDescr>(d.clone()).map_err(|e| {
                ValidationError::InvalidImport { step: step.to_string(), reason: e.to_string() }
            })?),
            None => None,
        };
        let value = match (p.value, &import) {
            (Some(v), _) => v,
            // Path-valued imports get their value from the fetched file.
            (None, Some(descr)) if descr.kind.provides_path() => String::new(),
            (None, _) => {
                return Err(ValidationError::step(step, format!("input '{}' has no value", p.param)));
            }
        };
        inputs.push(InputDef { param: p.param, value, import });
    }
    Ok(inputs)
}

fn parse_outputs(step: &str, raw: Option<&Value>) -> Result<Vec<OutputDef>, ValidationError> {
    let mut outputs = Vec::new();
    for p in parse_params(step, "outputs", "export", raw)? {
        let export = match p.descr {
            Some(d) => Some(serde_json::from_value::<ExportDescr>(d.clone()).map_err(|e| {
                ValidationError::InvalidExport { step: step.to_string(), reason: e.to_string() }
            })?),
            None => None,
        };
        // In the map layout the key doubles as the output name.
        let value = match p.value {
            Some(v) if !v.is_empty() => v,
            _ if p.from_map => p.param.clone(),
            _ => {
                return Err(ValidationError::step(step, format!("output '{}' has no value", p.param)));
            }
        };
        outputs.push(OutputDef { param: p.param, value, export });
    }
    Ok(outputs)
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn expect_str(step: &str, key: &str, v: &Value) -> Result<String, ValidationError> {
    v.as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ValidationError::step(step, format!("'{}' must be a non-empty string", key)))
}

fn expect_bool(step: &str, key: &str, v: Option<&Value>) -> Result<bool, ValidationError> {
    match v {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ValidationError::step(step, format!("'{}' must be a boolean", key))),
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
