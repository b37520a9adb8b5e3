/// Wraps a source so that `wallix-username` and `wallix_username` name the same key.
///
/// The flags and the environment produce snake_case keys, while config files commonly spell them with hyphens like
/// the flags do on the command line.
#[derive(Debug)]
pub(crate) struct SnakeCaseKeys(Box<dyn config::Source + Send + Sync>);

impl SnakeCaseKeys {
    pub(crate) fn new(source: impl config::Source + Send + Sync + 'static) -> Self {
        Self(Box::new(source))
    }
}

impl config::Source for SnakeCaseKeys {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new(Self(self.0.clone_into_box()))
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        Ok(self
            .0
            .collect()?
            .into_iter()
            .map(|(key, value)| (key.replace('-', "_"), value))
            .collect())
    }
}
