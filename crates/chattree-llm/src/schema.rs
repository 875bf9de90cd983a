use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Shape of a JSON value, convertible to JSON Schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String {
        description: Option<String>,
    },
    Array {
        description: Option<String>,
        items: Box<Schema>,
    },
    /// All properties are required and no others are allowed, as strict
    /// structured output demands.
    Object {
        description: Option<String>,
        properties: Vec<Property>,
    },
    /// A literal JSON Schema for shapes not covered above.
    Raw(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: Schema,
}

impl Property {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl Schema {
    pub fn string(description: impl Into<String>) -> Self {
        Schema::String {
            description: Some(description.into()),
        }
    }

    pub fn object(properties: impl IntoIterator<Item = Property>) -> Self {
        Schema::Object {
            description: None,
            properties: properties.into_iter().collect(),
        }
    }

    pub fn to_json_schema(&self) -> Value {
        let (mut value, description) = match self {
            Schema::String { description } => (json!({ "type": "string" }), description),
            Schema::Array { description, items } => (
                json!({ "type": "array", "items": items.to_json_schema() }),
                description,
            ),
            Schema::Object {
                description,
                properties,
            } => {
                let names: Vec<&str> = properties.iter().map(|p| p.name.as_str()).collect();
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|p| (p.name.clone(), p.schema.to_json_schema()))
                    .collect();
                (
                    json!({
                        "type": "object",
                        "properties": props,
                        "required": names,
                        "additionalProperties": false,
                    }),
                    description,
                )
            }
            Schema::Raw(value) => return value.clone(),
        };
        if let Some(description) = description {
            value["description"] = json!(description);
        }
        value
    }
}

/// Types that can describe their JSON shape.
pub trait Describe {
    fn describe() -> Schema;
}

impl Describe for String {
    fn describe() -> Schema {
        Schema::String { description: None }
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> Schema {
        Schema::Array {
            description: None,
            items: Box::new(T::describe()),
        }
    }
}

/// An answer type a model can be asked to produce directly.
///
/// ```
/// use chattree_llm::{Describe, Property, Schema, Structured};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Verdict {
///     label: String,
/// }
///
/// impl Describe for Verdict {
///     fn describe() -> Schema {
///         Schema::object([Property::new("label", Schema::string("one word"))])
///     }
/// }
///
/// impl Structured for Verdict {
///     const NAME: &'static str = "verdict";
/// }
///
/// assert_eq!(Verdict::describe().to_json_schema()["required"][0], "label");
/// ```
pub trait Structured: Describe + DeserializeOwned {
    /// Name the schema is registered under in the request.
    const NAME: &'static str;
}
