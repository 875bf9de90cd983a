use crate::message::Message;
use crate::schema::{Schema, Structured};

/// A frozen request, produced by [`RequestBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// `None` asks for free text.
    pub output: Option<OutputFormat>,
}

/// Structured-output contract: the answer must be JSON matching `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFormat {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    request: GenerateRequest,
}

/// Convenience entry point: `chattree_llm::request()`.
pub fn request() -> RequestBuilder {
    RequestBuilder::default()
}

impl RequestBuilder {
    // -- messages --

    pub fn system(&mut self, content: impl Into<String>) -> &mut Self {
        self.message(Message::system(content))
    }

    pub fn user(&mut self, content: impl Into<String>) -> &mut Self {
        self.message(Message::user(content))
    }

    pub fn assistant(&mut self, content: impl Into<String>) -> &mut Self {
        self.message(Message::assistant(content))
    }

    pub fn message(&mut self, message: Message) -> &mut Self {
        self.request.messages.push(message);
        self
    }

    pub fn messages(&mut self, messages: impl IntoIterator<Item = Message>) -> &mut Self {
        self.request.messages.extend(messages);
        self
    }

    // -- options --

    pub fn max_output_tokens(&mut self, n: u32) -> &mut Self {
        self.request.max_output_tokens = Some(n);
        self
    }

    pub fn temperature(&mut self, t: f32) -> &mut Self {
        self.request.temperature = Some(t);
        self
    }

    /// Ask for an answer that decodes as `T`.
    pub fn structured<T: Structured>(&mut self) -> &mut Self {
        self.request.output = Some(OutputFormat {
            name: T::NAME.to_string(),
            schema: T::describe(),
        });
        self
    }

    // -- build --

    pub fn build(&self) -> GenerateRequest {
        self.request.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::schema::{Describe, Property};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Label {
        #[allow(dead_code)]
        label: String,
    }

    impl Describe for Label {
        fn describe() -> Schema {
            Schema::object([Property::new("label", String::describe())])
        }
    }

    impl Structured for Label {
        const NAME: &'static str = "label";
    }

    #[test]
    fn builder_keeps_message_order_and_options() {
        let mut builder = request();
        builder
            .system("be brief")
            .user("hi")
            .assistant("hello")
            .max_output_tokens(800);

        let built = builder.build();

        let roles: Vec<Role> = built.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(built.messages[2].content, "hello");
        assert_eq!(built.max_output_tokens, Some(800));
        assert!(built.output.is_none());
    }

    #[test]
    fn structured_output_uses_the_type_schema() {
        let built = request().user("classify").structured::<Label>().build();

        let output = built.output.unwrap();
        assert_eq!(output.name, "label");
        assert_eq!(output.schema, Label::describe());
    }
}
