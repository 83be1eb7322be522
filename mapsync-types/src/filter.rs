//! See [`FilterExpression`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::DescriptorError;

/// Property map of a feature the filters are evaluated against.
pub type FeatureProperties = Map<String, Value>;

/// Literal a feature property is compared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal.
    Number(f64),
    /// String literal.
    String(String),
}

impl FilterValue {
    /// Returns true if the property value equals this literal.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FilterValue::Bool(expected) => value.as_bool() == Some(*expected),
            FilterValue::Number(expected) => value.as_f64() == Some(*expected),
            FilterValue::String(expected) => value.as_str() == Some(expected.as_str()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FilterValue::Bool(v) => Value::Bool(*v),
            FilterValue::Number(v) => json!(v),
            FilterValue::String(v) => Value::String(v.clone()),
        }
    }

    fn from_json(value: &Value) -> Result<Self, DescriptorError> {
        match value {
            Value::Bool(v) => Ok(FilterValue::Bool(*v)),
            Value::Number(v) => v
                .as_f64()
                .map(FilterValue::Number)
                .ok_or_else(|| DescriptorError::Filter(format!("unsupported number {v}"))),
            Value::String(v) => Ok(FilterValue::String(v.clone())),
            other => Err(DescriptorError::Filter(format!(
                "expected a literal, got {other}"
            ))),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Predicate over feature properties that decides which features of a source a layer draws.
///
/// The expression is stored as a typed tree, but is read and written in the nested array form
/// used by map styles:
///
/// ```
/// use mapsync_types::FilterExpression;
/// use serde_json::json;
///
/// let filter = FilterExpression::matching("RESORT", ["Alta Ski Area"]);
/// assert_eq!(
///     filter.to_json(),
///     json!(["all", ["match", ["get", "RESORT"], ["Alta Ski Area"], true, false]])
/// );
/// ```
///
/// Expressions are compared structurally, so two filters built from the same selection are
/// equal even if they were created independently.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// True if all children are true. Empty list is true.
    All(Vec<FilterExpression>),
    /// True if any child is true. Empty list is false.
    Any(Vec<FilterExpression>),
    /// Negation of the child.
    Not(Box<FilterExpression>),
    /// `["match", ["get", field], [values...], matched, otherwise]`
    Match {
        /// Feature property to look up.
        field: String,
        /// Labels the property is compared with.
        values: Vec<FilterValue>,
        /// Result if the property equals one of the labels.
        matched: bool,
        /// Result in all other cases, including a missing property.
        otherwise: bool,
    },
    /// `["==", ["get", field], value]`
    Eq {
        /// Feature property to look up.
        field: String,
        /// Expected value.
        value: FilterValue,
    },
    /// `["has", field]`
    Has(String),
    /// Constant result.
    Literal(bool),
}

impl FilterExpression {
    /// Builds the filter used by multi-select filter widgets: a feature passes if its `field`
    /// equals any of the `values`.
    pub fn matching<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        FilterExpression::All(vec![FilterExpression::Match {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            matched: true,
            otherwise: false,
        }])
    }

    /// Evaluates the predicate for a feature with the given properties.
    pub fn evaluate(&self, properties: &FeatureProperties) -> bool {
        match self {
            FilterExpression::All(children) => children.iter().all(|c| c.evaluate(properties)),
            FilterExpression::Any(children) => children.iter().any(|c| c.evaluate(properties)),
            FilterExpression::Not(child) => !child.evaluate(properties),
            FilterExpression::Match {
                field,
                values,
                matched,
                otherwise,
            } => match properties.get(field) {
                Some(value) if values.iter().any(|v| v.matches(value)) => *matched,
                _ => *otherwise,
            },
            FilterExpression::Eq { field, value } => {
                properties.get(field).is_some_and(|v| value.matches(v))
            }
            FilterExpression::Has(field) => properties.contains_key(field),
            FilterExpression::Literal(value) => *value,
        }
    }

    /// Converts the expression into the nested array form.
    pub fn to_json(&self) -> Value {
        match self {
            FilterExpression::All(children) => with_operator("all", children),
            FilterExpression::Any(children) => with_operator("any", children),
            FilterExpression::Not(child) => json!(["!", child.to_json()]),
            FilterExpression::Match {
                field,
                values,
                matched,
                otherwise,
            } => {
                let labels: Vec<Value> = values.iter().map(FilterValue::to_json).collect();
                json!(["match", ["get", field], labels, matched, otherwise])
            }
            FilterExpression::Eq { field, value } => {
                json!(["==", ["get", field], value.to_json()])
            }
            FilterExpression::Has(field) => json!(["has", field]),
            FilterExpression::Literal(value) => Value::Bool(*value),
        }
    }

    /// Parses an expression from the nested array form.
    pub fn from_json(value: &Value) -> Result<Self, DescriptorError> {
        let items = match value {
            Value::Bool(v) => return Ok(FilterExpression::Literal(*v)),
            Value::Array(items) => items,
            other => {
                return Err(DescriptorError::Filter(format!(
                    "expected an array expression, got {other}"
                )))
            }
        };

        let Some((operator, args)) = items.split_first() else {
            return Err(DescriptorError::Filter("empty expression".into()));
        };

        match operator.as_str() {
            Some("all") => Ok(FilterExpression::All(parse_children(args)?)),
            Some("any") => Ok(FilterExpression::Any(parse_children(args)?)),
            Some("!") => match args {
                [child] => Ok(FilterExpression::Not(Box::new(Self::from_json(child)?))),
                _ => Err(arity("!", 1, args.len())),
            },
            Some("has") => match args {
                [Value::String(field)] => Ok(FilterExpression::Has(field.clone())),
                _ => Err(DescriptorError::Filter(
                    "`has` expects a single field name".into(),
                )),
            },
            Some("==") => match args {
                [getter, value] => Ok(FilterExpression::Eq {
                    field: parse_getter(getter)?,
                    value: FilterValue::from_json(value)?,
                }),
                _ => Err(arity("==", 2, args.len())),
            },
            Some("match") => match args {
                [getter, labels, Value::Bool(matched), Value::Bool(otherwise)] => {
                    let values = match labels {
                        Value::Array(labels) => labels
                            .iter()
                            .map(FilterValue::from_json)
                            .collect::<Result<_, _>>()?,
                        single => vec![FilterValue::from_json(single)?],
                    };

                    Ok(FilterExpression::Match {
                        field: parse_getter(getter)?,
                        values,
                        matched: *matched,
                        otherwise: *otherwise,
                    })
                }
                _ => Err(DescriptorError::Filter(
                    "only the `[\"match\", input, labels, bool, bool]` form is supported".into(),
                )),
            },
            Some(other) => Err(DescriptorError::Filter(format!(
                "unsupported operator `{other}`"
            ))),
            None => Err(DescriptorError::Filter(format!(
                "operator must be a string, got {operator}"
            ))),
        }
    }
}

fn with_operator(operator: &str, children: &[FilterExpression]) -> Value {
    let mut items = Vec::with_capacity(children.len() + 1);
    items.push(Value::String(operator.to_owned()));
    items.extend(children.iter().map(FilterExpression::to_json));
    Value::Array(items)
}

fn parse_children(args: &[Value]) -> Result<Vec<FilterExpression>, DescriptorError> {
    args.iter().map(FilterExpression::from_json).collect()
}

fn parse_getter(value: &Value) -> Result<String, DescriptorError> {
    match value.as_array().map(Vec::as_slice) {
        Some([Value::String(get), Value::String(field)]) if get == "get" => Ok(field.clone()),
        _ => Err(DescriptorError::Filter(format!(
            "expected [\"get\", field], got {value}"
        ))),
    }
}

fn arity(operator: &str, expected: usize, actual: usize) -> DescriptorError {
    DescriptorError::Filter(format!(
        "`{operator}` expects {expected} argument(s), got {actual}"
    ))
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
