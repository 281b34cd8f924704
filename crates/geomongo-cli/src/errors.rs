use console::style;
use std::fmt;

/// Error with suggestions for the user
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for database connection failure
pub fn database_connection_failed(error: &str) -> CliError {
    CliError::new("Cannot connect to MongoDB")
        .with_context(format!("The server is unreachable or refused the connection.\n\nError: {}", error))
        .with_suggestion("Start a server: mongod --dbpath /data/db")
        .with_suggestion("Point at another server: --uri mongodb://host:27017 or GEOMONGO_URI")
        .with_suggestion("Or add to geomongo.toml:\n  uri = \"mongodb://localhost:27017\"")
        .with_help("Run: geomongo --help")
}

/// Create error for a missing shapefile
pub fn dataset_not_found(error: &str) -> CliError {
    CliError::new("Dataset not found")
        .with_context(format!("A shapefile or one of its components is missing.\n\nError: {}", error))
        .with_suggestion("Check --data-dir; each dataset needs <name>.shp, <name>.shx and <name>.dbf")
        .with_suggestion("Or select datasets explicitly: --datasets points,polygons")
        .with_help("Run: geomongo import --help")
}

/// Create error for invalid configuration
pub fn invalid_config(error: &str) -> CliError {
    CliError::new("Invalid configuration")
        .with_context(format!("Configuration value is invalid.\n\nError: {}", error))
        .with_suggestion("Check geomongo.toml for syntax errors")
        .with_suggestion("Check GEOMONGO_* environment variables")
        .with_help("Run: geomongo --help")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: &anyhow::Error) -> CliError {
    let message = format!("{:#}", error);

    if message.contains("Failed to connect") || message.contains("Server selection timeout") {
        database_connection_failed(&message)
    } else if message.contains("Invalid dataset path")
        || message.contains("Missing required component files")
    {
        dataset_not_found(&message)
    } else if message.contains("Invalid configuration") || message.contains("configuration file") {
        invalid_config(&message)
    } else {
        CliError::new(message)
    }
}
