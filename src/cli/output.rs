use crate::core::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    /// Resolve output options from config settings plus CLI flags;
    /// flags win over the config file.
    pub fn resolve(
        settings: &Settings,
        format_flag: Option<&str>,
        json_flag: bool,
        pretty: bool,
        no_color: bool,
        verbose: bool,
    ) -> Self {
        let format = if json_flag {
            OutputFormat::Json
        } else {
            match format_flag.unwrap_or(settings.default_format.as_str()) {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            }
        };

        let color_allowed = match settings.color.as_str() {
            "always" => true,
            "never" => false,
            _ => !no_color,
        };

        Self {
            format,
            pretty,
            use_color: detect_color(color_allowed && !no_color),
            verbose,
        }
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty_stdout()
}

fn atty_stdout() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
