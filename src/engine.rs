use std::collections::HashMap;

use tracing::debug;

use crate::error::{EtlateError, EtlateResult};
use crate::evaluator::Evaluator;
use crate::expr::DefaultEvaluator;
use crate::interface::EtlateInterface;
use crate::template::Template;
use crate::value::Context;

/// Settings applied when an [`Engine`] processes template source.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    /// Remove the line breaks and indentation around directives that sit
    /// alone on their line.
    pub trim_blank_lines: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trim_blank_lines: true,
        }
    }
}

/// `Engine` is the primary implementation of the [`EtlateInterface`] trait.
///
/// It manages a collection of named templates and renders them with one
/// [`Evaluator`], which defaults to [`DefaultEvaluator`].
///
/// # Examples
///
/// ```
/// use etlate::{Context, Engine, EtlateInterface};
///
/// // Create a new engine
/// let mut engine = Engine::new();
///
/// // Add a template
/// engine
///     .add_template("greeting", "Hello, {% name %}!")
///     .unwrap();
///
/// // Setup context
/// let mut context = Context::new().with("name", "World");
///
/// // Render template
/// let output = engine.render("greeting", &mut context).unwrap();
/// assert_eq!(output, "Hello, World!");
/// ```
#[derive(Debug, Clone)]
pub struct Engine<E = DefaultEvaluator> {
    templates: HashMap<String, Template>,
    evaluator: E,
    config: EngineConfig,
}

impl Engine {
    /// Creates a new empty `Engine` using the [`DefaultEvaluator`].
    pub fn new() -> Self {
        Self::with_evaluator(DefaultEvaluator::default())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Evaluator> Engine<E> {
    /// Creates a new empty `Engine` that evaluates expressions with
    /// `evaluator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use etlate::{Context, Engine, EtlateInterface, EvalError, Value};
    ///
    /// let shout = |expression: &str, context: &Context| {
    ///     match context.get(expression) {
    ///         Some(Value::String(s)) => Ok(Value::from(s.to_uppercase())),
    ///         _ => Err(EvalError::custom("strings only")),
    ///     }
    /// };
    ///
    /// let engine = Engine::with_evaluator(shout);
    /// let mut context = Context::new().with("name", "ada");
    /// assert_eq!(engine.render_str("hi {% name %}", &mut context).unwrap(), "hi ADA");
    /// ```
    pub fn with_evaluator(evaluator: E) -> Self {
        Self {
            templates: HashMap::new(),
            evaluator,
            config: EngineConfig::default(),
        }
    }

    /// Replaces the configuration used for templates added from now on.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn template<N: AsRef<str>>(&self, name: N) -> Option<&Template> {
        self.templates.get(name.as_ref())
    }

    /// Names of all registered templates, in no particular order.
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl<E: Evaluator> EtlateInterface for Engine<E> {
    /// Adds a new template to the engine with the given name and content.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the template was successfully added
    /// * `Err(EtlateError::TemplateExists)` if a template with the given name already exists
    /// * `Err(EtlateError::Parse)` if the template content contains syntax errors
    ///
    /// # Examples
    ///
    /// ```
    /// use etlate::{Engine, EtlateInterface};
    ///
    /// let mut engine = Engine::new();
    /// engine.add_template("greeting", "Hello, {% name %}!").unwrap();
    /// assert!(engine.add_template("greeting", "again").is_err());
    /// ```
    fn add_template<N: AsRef<str>, C: Into<String>>(
        &mut self,
        name: N,
        content: C,
    ) -> EtlateResult<()> {
        let name = name.as_ref();

        if self.templates.contains_key(name) {
            return Err(EtlateError::TemplateExists {
                template_name: name.to_string(),
            });
        }

        let template = Template::with_config(content, &self.config)?;
        debug!(
            name,
            nodes = template.ast().len(),
            "registered template"
        );
        self.templates.insert(name.to_string(), template);

        Ok(())
    }

    fn remove_template<N: AsRef<str>>(&mut self, name: N) -> Option<Template> {
        let name = name.as_ref();
        let removed = self.templates.remove(name);
        if removed.is_some() {
            debug!(name, "removed template");
        }
        removed
    }

    fn has_template<N: AsRef<str>>(&self, name: N) -> bool {
        self.templates.contains_key(name.as_ref())
    }

    /// Renders a template with the given name using the provided context.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` containing the rendered template content
    /// * `Err(EtlateError::MissingTemplate)` if no template with the given name exists
    /// * `Err(EtlateError::Evaluation)` if an expression fails to evaluate
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &mut Context,
    ) -> EtlateResult<String> {
        let name = template_name.as_ref();
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| EtlateError::MissingTemplate {
                template_name: name.to_string(),
            })?;

        template.render(context, &self.evaluator)
    }

    fn render_str<C: AsRef<str>>(&self, content: C, context: &mut Context) -> EtlateResult<String> {
        Template::with_config(content.as_ref(), &self.config)?.render(context, &self.evaluator)
    }
}
