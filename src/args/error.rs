use thiserror::Error;

/// Terminal failure of a parse call
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("Unknown short flag `{0}`.")]
    UnknownShortFlag(char),

    #[error("Unknown flag `{0}`.")]
    UnknownFlag(String),

    #[error("Missing required option `{0}`.")]
    MissingOption(String),

    #[error("Missing required argument `{0}`.")]
    MissingArgument(String),

    #[error("Missing required argument `{argument}` for option `{option}`.")]
    MissingOptionArgument { argument: String, option: String },

    /// A transformer rejected the value of a required argument
    #[error("Invalid value for argument `{argument}`{}: {cause}", option_suffix(.option))]
    Transform {
        argument: String,
        option: Option<String>,
        cause: anyhow::Error,
    },
}

fn option_suffix(option: &Option<String>) -> String {
    match option {
        Some(option) => format!(" of option `{option}`"),
        None => String::new(),
    }
}
