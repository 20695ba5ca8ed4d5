use crate::error::EtlateResult;
use crate::template::Template;
use crate::value::Context;

/// `EtlateInterface` is the trait for the etlate templating engine: a store
/// of named templates rendered against a mutable [`Context`].
pub trait EtlateInterface {
    /// `add_template` processes `content` and makes it available under `name`.
    ///
    /// # Errors
    /// - If the template name is a duplicate.
    /// - If the template fails to parse.
    fn add_template<N: AsRef<str>, C: Into<String>>(
        &mut self,
        name: N,
        content: C,
    ) -> EtlateResult<()>;

    /// `remove_template` drops a template, returning it if it was present.
    fn remove_template<N: AsRef<str>>(&mut self, name: N) -> Option<Template>;

    fn has_template<N: AsRef<str>>(&self, name: N) -> bool;

    /// `render` renders a registered template with the given context.
    ///
    /// # Errors
    /// - If the template name is not found.
    /// - If any expression in the template fails to evaluate.
    fn render<N: AsRef<str>>(
        &self,
        template_name: N,
        context: &mut Context,
    ) -> EtlateResult<String>;

    /// `render_str` processes and renders a one-off template without
    /// registering it.
    ///
    /// # Errors
    /// - If the template fails to parse.
    /// - If any expression in the template fails to evaluate.
    fn render_str<C: AsRef<str>>(&self, content: C, context: &mut Context) -> EtlateResult<String>;
}
