pub mod config {
    use serde::Deserialize;

    use crate::task;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_tasks_file")]
        pub tasks_file: String,
        #[serde(default = "default_date_formats")]
        pub date_formats: Vec<String>,
    }

    impl Config {
        /// Loads configuration from environment variables.
        ///
        /// `DATE_FORMATS` is a comma-separated list of chrono format
        /// strings, tried in order when parsing due dates.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(
                    config::Environment::default()
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("date_formats"),
                )
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_tasks_file() -> String {
        "tasks.json".to_string()
    }

    fn default_date_formats() -> Vec<String> {
        task::DEFAULT_DATE_FORMATS
            .iter()
            .map(|format| format.to_string())
            .collect()
    }
}
pub mod task;
pub mod web;
