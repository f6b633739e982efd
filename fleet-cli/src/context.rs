use tracing::Span;

use crate::component::ComponentInstance;
use crate::exit_codes::ExitCodes;

/// Everything one stop run needs to know about its surroundings.
#[derive(Debug, Clone)]
pub struct StopContext {
    pub component: ComponentInstance,
    /// Span the run's log lines are recorded in
    pub span: Span,
    /// Emit the outcome lines; errors are reported regardless
    pub show_output: bool,
    /// Codes the run's failures map to
    pub exit_codes: ExitCodes,
}

impl StopContext {
    pub fn new(component: ComponentInstance) -> Self {
        let span = tracing::info_span!(
            "stop",
            kind = component.kind.as_str(),
            dir = %component.directory.display()
        );
        Self {
            component,
            span,
            show_output: true,
            exit_codes: ExitCodes::default(),
        }
    }

    pub fn with_exit_codes(mut self, exit_codes: ExitCodes) -> Self {
        self.exit_codes = exit_codes;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.show_output = !quiet;
        self
    }
}
