//! Variables of a test execution and their JSON form
//!
//! A state record is `{systemId, testId, variables: {inputs, outputs}}`.
//! Values are booleans, numbers, numeric strings (`"NaN"`, `"Infinity"`),
//! `"$..."` strings holding text, or arrays whose first element tags the
//! sequence kind (`"A"` for arrays, `"L"` for lists).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde_json::Value as Json;

use crate::error::DataError;
use crate::state::value::{Sequence, Value};

/// Suffix of source-execution variables in a metamorphic pair
pub const SOURCE_SUFFIX: &str = "_s";
/// Suffix of follow-up-execution variables in a metamorphic pair
pub const FOLLOWUP_SUFFIX: &str = "_f";
/// Prefix of output variables
pub const OUTPUT_PREFIX: &str = "o_";

/// Name of a variable in the source execution of a pair
pub fn to_source(name: &str) -> String {
    format!("{}{}", name, SOURCE_SUFFIX)
}

/// Name of a variable in the follow-up execution of a pair
pub fn to_followup(name: &str) -> String {
    format!("{}{}", name, FOLLOWUP_SUFFIX)
}

/// Test id of a metamorphic pair
pub fn join_source_followup(source: &str, followup: &str) -> String {
    format!("{}:{}", source, followup)
}

/// Variable bindings of one execution, partitioned into inputs and outputs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Variables {
    values: HashMap<String, Value>,
    inputs: BTreeSet<String>,
    outputs: BTreeSet<String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable; a name is either an input or an output, never both
    pub fn add(&mut self, name: impl Into<String>, value: Value, is_input: bool) -> Option<Value> {
        let name = name.into();
        if is_input {
            self.outputs.remove(&name);
            self.inputs.insert(name.clone());
        } else {
            self.inputs.remove(&name);
            self.outputs.insert(name.clone());
        }
        self.values.insert(name, value)
    }

    /// Builder-style input binding
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value.into(), true);
        self
    }

    /// Builder-style output binding
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(name, value.into(), false);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn inputs(&self) -> &BTreeSet<String> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<String> {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Combine a source and a follow-up execution into one binding set
    ///
    /// Every variable `v` of the source becomes `v_s` and `v_f`; the
    /// follow-up must bind every variable of the source.
    pub fn make_metamorphic(source: &Variables, followup: &Variables) -> Result<Variables, DataError> {
        let mut result = Variables::new();
        for (name, value) in &source.values {
            let followup_value = followup
                .values
                .get(name)
                .ok_or_else(|| DataError::MissingVariable(name.clone()))?;
            let is_input = source.inputs.contains(name);
            result.add(to_source(name), value.clone(), is_input);
            result.add(to_followup(name), followup_value.clone(), is_input);
        }
        Ok(result)
    }

    fn read_json_variables(&mut self, json: &Json, is_input: bool, record: &str) -> Result<(), DataError> {
        let map = json.as_object().ok_or_else(|| DataError::InvalidRecord {
            record: record.to_string(),
            message: "variables must be an object".to_string(),
        })?;
        for (name, value) in map {
            self.add(name.clone(), read_json_value(value, record)?, is_input);
        }
        Ok(())
    }
}

/// Parse a single serialized value
pub fn read_json_value(json: &Json, record: &str) -> Result<Value, DataError> {
    match json {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => n.as_f64().map(Value::Number).ok_or_else(|| DataError::InvalidRecord {
            record: record.to_string(),
            message: format!("number out of range: {}", n),
        }),
        Json::String(s) => read_json_string(s, record),
        Json::Array(items) => read_json_array(items, record),
        // Unserializable objects and nulls are present but unusable
        Json::Object(_) | Json::Null => Ok(Value::Opaque),
    }
}

fn read_json_string(s: &str, record: &str) -> Result<Value, DataError> {
    if let Some(text) = s.strip_prefix('$') {
        return Ok(Value::Sequence(Sequence::text(text)));
    }
    if let Ok(number) = s.parse::<f64>() {
        return Ok(Value::Number(number));
    }
    // Recorded exceptions
    if s.starts_with("ERROR") {
        return Ok(Value::Opaque);
    }
    Err(DataError::InvalidRecord {
        record: record.to_string(),
        message: format!("invalid serialized value \"{}\"", s),
    })
}

fn read_json_array(items: &[Json], record: &str) -> Result<Value, DataError> {
    let mut iter = items.iter().peekable();
    if let Some(Json::String(tag)) = iter.peek() {
        match tag.as_str() {
            "A" | "L" => {
                iter.next();
            }
            other => {
                return Err(DataError::InvalidRecord {
                    record: record.to_string(),
                    message: format!("unsupported sequence type: {}", other),
                })
            }
        }
    }
    let mut numbers = Vec::with_capacity(items.len());
    for item in iter {
        match read_json_value(item, record)? {
            Value::Number(n) => numbers.push(n),
            Value::Bool(b) => numbers.push(if b { 1.0 } else { 0.0 }),
            _ => return Ok(Value::Opaque),
        }
    }
    Ok(Value::Sequence(Sequence::numeric(numbers)))
}

/// A recorded execution of one test against one system version
#[derive(Clone, Debug, PartialEq)]
pub struct TestExecution {
    pub system_id: String,
    pub test_id: String,
    pub variables: Variables,
}

impl TestExecution {
    pub fn new(system_id: impl Into<String>, test_id: impl Into<String>, variables: Variables) -> Self {
        Self {
            system_id: system_id.into(),
            test_id: test_id.into(),
            variables,
        }
    }

    /// Parse a state record
    pub fn from_json(json: &Json) -> Result<Self, DataError> {
        let field = |name: &str| {
            json.get(name)
                .and_then(Json::as_str)
                .map(str::to_string)
                .ok_or_else(|| DataError::InvalidRecord {
                    record: json.to_string().chars().take(64).collect(),
                    message: format!("missing {}", name),
                })
        };
        let system_id = field("systemId")?;
        let test_id = field("testId")?;
        let record = format!("{}/{}", system_id, test_id);
        let vars = json.get("variables").ok_or_else(|| DataError::InvalidRecord {
            record: record.clone(),
            message: "missing variables".to_string(),
        })?;

        let mut variables = Variables::new();
        if let Some(inputs) = vars.get("inputs") {
            variables.read_json_variables(inputs, true, &record)?;
        }
        if let Some(outputs) = vars.get("outputs") {
            variables.read_json_variables(outputs, false, &record)?;
        }
        Ok(Self::new(system_id, test_id, variables))
    }

    /// Parse a state record from text
    pub fn from_json_str(content: &str) -> Result<Self, DataError> {
        let json: Json = serde_json::from_str(content)?;
        Self::from_json(&json)
    }

    /// Load a state record file
    pub fn load(path: &Path) -> Result<Self, DataError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Pair a source and a follow-up execution of the same system
    pub fn metamorphic(source: &TestExecution, followup: &TestExecution) -> Result<Self, DataError> {
        Ok(Self {
            system_id: source.system_id.clone(),
            test_id: join_source_followup(&source.test_id, &followup.test_id),
            variables: Variables::make_metamorphic(&source.variables, &followup.variables)?,
        })
    }
}
