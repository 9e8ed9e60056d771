use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Install a stderr logger honoring `RUST_LOG`, once per process. A no-op if
/// the host application already installed a `log` implementation.
pub fn ensure_initialized() {
    if log::max_level() != LevelFilter::Off {
        return;
    }

    INIT.call_once(|| {
        use logforth::append;
        use logforth::filter::EnvFilter;
        use logforth::layout::TextLayout;

        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        logforth::builder()
            .dispatch(|d| {
                d.filter(EnvFilter::from(filter.as_str()))
                    .append(append::Stderr::default().with_layout(TextLayout::default().no_color()))
            })
            .apply();
    });
}
