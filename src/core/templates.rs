use minijinja::{Environment, Value};
use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use tracing::info;

use crate::error::LbResult;

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in Template::iter() {
        // Templates are static strings checked by the tests below.
        if let Err(e) = env.add_template(template.name(), template.template()) {
            tracing::error!("Could not load template {}. {e}", template.name());
        }
    }

    env
});

#[derive(Debug, Clone, Copy, EnumIter)]
pub enum Template {
    LocationBoard,
    EventBoard,
    NotFound,
    Failure,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::LocationBoard => "location_board.txt",
            Template::EventBoard => "event_board.txt",
            Template::NotFound => "not_found.txt",
            Template::Failure => "failure.txt",
        }
    }

    /// Render with `ctx`, usually built with `minijinja::context!`.
    pub fn render(&self, ctx: Value) -> LbResult<String> {
        let template = TEMPLATES_ENVIRONMENT.get_template(self.name())?;
        Ok(template.render(ctx)?)
    }

    pub fn template(&self) -> &'static str {
        match self {
            Template::LocationBoard => {
                "🏔️  {{ title }} (as of {{ timestamp }})\n\
                {%- if table %}\n{{ table }}{% else %}\nNo entries yet.{% endif %}"
            }
            Template::EventBoard => {
                "🎉 {{ title }} event (as of {{ timestamp }})\n\
                {%- if table %}\n{{ table }}{% else %}\nNo entries yet.{% endif %}"
            }
            Template::NotFound => {
                "404 😶 {{ message }}\n\
                Known locations: {{ locations|join(', ') }}\n\
                Known events: {{ events|join(', ') }}"
            }
            Template::Failure => "💥 Error fetching data: {{ message }}",
        }
    }
}
