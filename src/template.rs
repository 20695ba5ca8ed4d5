use crate::ast::Ast;
use crate::engine::EngineConfig;
use crate::error::EtlateResult;
use crate::evaluator::Evaluator;
use crate::parser::process;
use crate::render::render;
use crate::value::Context;

/// A Template is processed template source, ready to be rendered any number
/// of times.
///
/// The source is scanned, trimmed and built into an [`Ast`] once, in
/// [`Template::new`]. Rendering only reads that tree, so one template can be
/// rendered against many independent contexts.
///
/// # Example
///
/// ```rust
/// use etlate::{Context, DefaultEvaluator, Template};
///
/// let template = Template::new("{% for x in xs %}<{% x %}>{% end %}").unwrap();
///
/// let mut context = Context::new().with("xs", vec![1, 2, 3]);
/// let result = template.render(&mut context, &DefaultEvaluator::new()).unwrap();
/// assert_eq!(result, "<1><2><3>");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    content: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    ast: Ast,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct TemplateHelper {
            content: String,
        }

        let helper = TemplateHelper::deserialize(deserializer)?;

        // The tree is never serialized; rebuild it from the source.
        Template::new(helper.content)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse template: {}", e)))
    }
}

impl Template {
    /// Processes `content` with the default [`EngineConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::EtlateError::Parse`] if the template is malformed:
    /// a bad directive, an unbalanced block or an unterminated `{% ... %}`.
    pub fn new<T: Into<String>>(content: T) -> EtlateResult<Self> {
        Self::with_config(content, &EngineConfig::default())
    }

    /// Processes `content`, honouring `config`.
    pub fn with_config<T: Into<String>>(content: T, config: &EngineConfig) -> EtlateResult<Self> {
        let content = content.into();
        let ast = process(&content, config.trim_blank_lines)?;
        Ok(Self { content, ast })
    }

    /// The source this template was built from.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Renders the template.
    ///
    /// `context` is borrowed mutably because `for` loops bind their variable
    /// in it while they run. Every binding is restored before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EtlateError::Evaluation`] carrying the failing
    /// expression text if `evaluator` rejects any expression.
    ///
    /// # Example
    ///
    /// ```
    /// use etlate::{Context, DefaultEvaluator, Template};
    ///
    /// let template = Template::new("{% if admin %}root{% else %}{% user %}{% end %}").unwrap();
    /// let evaluator = DefaultEvaluator::new();
    ///
    /// let mut context = Context::new().with("admin", false).with("user", "ada");
    /// assert_eq!(template.render(&mut context, &evaluator).unwrap(), "ada");
    ///
    /// context.insert("admin", true);
    /// assert_eq!(template.render(&mut context, &evaluator).unwrap(), "root");
    /// ```
    pub fn render<E>(&self, context: &mut Context, evaluator: &E) -> EtlateResult<String>
    where
        E: Evaluator + ?Sized,
    {
        render(&self.ast, context, evaluator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Child, NodeKind};
    use crate::error::{EtlateError, ParseErrorKind};
    use crate::expr::DefaultEvaluator;

    #[test]
    #[ntest::timeout(100)]
    fn test_template_keeps_content() {
        let template = Template::new("a{% b %}c").unwrap();
        assert_eq!(template.content(), "a{% b %}c");
        assert_eq!(template.ast().len(), 1);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_template_parse_error() {
        match Template::new("{% if x %}") {
            Err(EtlateError::Parse(err)) => assert_eq!(err.kind, ParseErrorKind::UnclosedBlock),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_template_without_trimming() {
        let config = EngineConfig {
            trim_blank_lines: false,
        };
        let template = Template::with_config("{% if x %}\nY\n{% end %}\n", &config).unwrap();
        let mut context = Context::new().with("x", true);
        assert_eq!(
            template.render(&mut context, &DefaultEvaluator::new()).unwrap(),
            "\nY\n\n"
        );

        let trimmed = Template::new("{% if x %}\nY\n{% end %}\n").unwrap();
        assert_eq!(
            trimmed.render(&mut context, &DefaultEvaluator::new()).unwrap(),
            "Y\n"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_template_is_reusable() {
        let template = Template::new("{% for n in ns %}{% n * 2 %} {% end %}").unwrap();
        let evaluator = DefaultEvaluator::new();

        let mut first = Context::new().with("ns", vec![1, 2]);
        let mut second = Context::new().with("ns", vec![5]);
        assert_eq!(template.render(&mut first, &evaluator).unwrap(), "2 4 ");
        assert_eq!(template.render(&mut second, &evaluator).unwrap(), "10 ");
        assert_eq!(template.render(&mut first, &evaluator).unwrap(), "2 4 ");

        let Some(Child::Node(id)) = template.ast().root().first() else {
            panic!("expected a node");
        };
        let NodeKind::For { variable, .. } = template.ast().node(*id).kind() else {
            panic!("expected a for node");
        };
        assert_eq!(variable, "n");
    }
}
