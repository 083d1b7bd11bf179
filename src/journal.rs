//! Journal (traces structurées)
//!
//! Console : filtrée par `RUST_LOG` (défaut `warn`), par exemple
//! - `RUST_LOG=debug`
//! - `RUST_LOG=formule_etiquettes::noyau::suggestions=trace`
//!
//! Fichier : `~/.config/formule-etiquettes/logs/formule.log`, rotation quotidienne,
//! niveau debug (natif seulement).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let registry = tracing_subscriber::registry().with(console_layer);

    // `try_init` : un second appel (tests, rechargement web) ne doit pas paniquer.
    #[cfg(not(target_arch = "wasm32"))]
    {
        let file_layer = match crate::config::ensure_logs_dir() {
            Ok(logs_dir) => {
                let file_appender = tracing_appender::rolling::daily(logs_dir, "formule.log");
                Some(
                    fmt::layer()
                        .with_writer(file_appender)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true)
                        .with_filter(EnvFilter::new("debug")),
                )
            }
            Err(e) => {
                eprintln!("Attention : journal fichier indisponible: {}", e);
                None
            }
        };
        let _ = registry.with(file_layer).try_init();
    }

    #[cfg(target_arch = "wasm32")]
    {
        let _ = registry.try_init();
    }
}
