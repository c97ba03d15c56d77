use handlebars::{Handlebars, TemplateError};
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

const TEMPLATES: &[(&str, &str)] = &[
    // Layout + pages
    ("layouts/base", include_str!("../../templates/layouts/base.hbs")),
    ("pages/home", include_str!("../../templates/pages/home.hbs")),
    ("pages/not_found", include_str!("../../templates/pages/not_found.hbs")),
    // Partial endpoints
    ("partials/notification_bell", include_str!("../../templates/partials/notification_bell.hbs")),
    ("partials/toast_list", include_str!("../../templates/partials/toast_list.hbs")),
    ("partials/toast", include_str!("../../templates/partials/toast.hbs")),
];

const PARTIALS: &[(&str, &str)] = &[
    ("navbar", include_str!("../../templates/partials/navbar.hbs")),
    ("toast", include_str!("../../templates/partials/toast.hbs")),
];

pub fn build_handlebars() -> Result<Hbs, TemplateError> {
    let mut hb = Handlebars::new();

    for (name, source) in TEMPLATES {
        hb.register_template_string(name, source)?;
    }
    for (name, source) in PARTIALS {
        hb.register_partial(name, source)?;
    }

    Ok(Arc::new(hb))
}
