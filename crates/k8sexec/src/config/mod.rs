pub mod cli;

pub use cli::*;

/// Which containers a run targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Unique targets of the whole namespace.
    AllPods,
    /// Every container of one pod; a pod that is not running yields nothing.
    Pod { pod: String },
    /// One container of one pod; the pod must be running.
    Container { pod: String, container: String },
}

impl Selection {
    /// Derives the selection mode from the pod and container flags.
    ///
    /// A container without a pod selects the whole namespace.
    pub fn from_flags(pod: Option<&str>, container: Option<&str>) -> Self {
        let pod = pod.filter(|p| !p.is_empty());
        let container = container.filter(|c| !c.is_empty());
        match (pod, container) {
            (Some(pod), Some(container)) => Selection::Container {
                pod: pod.to_string(),
                container: container.to_string(),
            },
            (Some(pod), None) => Selection::Pod {
                pod: pod.to_string(),
            },
            (None, _) => Selection::AllPods,
        }
    }
}

/// Everything a run needs besides the cluster handles and captured input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub namespace: String,
    pub selection: Selection,
    /// Command argument vector; may be empty when stdin is piped.
    pub command: Vec<String>,
    /// Execute against every running pod instead of unique targets.
    pub all_replicas: bool,
    /// Skip containers in which this utility cannot be executed.
    pub require_utility: Option<String>,
}

impl RunConfig {
    pub fn builder(namespace: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder {
            config: RunConfig {
                namespace: namespace.into(),
                selection: Selection::AllPods,
                command: Vec::new(),
                all_replicas: false,
                require_utility: None,
            },
        }
    }
}

pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn selection(mut self, selection: Selection) -> Self {
        self.config.selection = selection;
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn all_replicas(mut self, all_replicas: bool) -> Self {
        self.config.all_replicas = all_replicas;
        self
    }

    pub fn require_utility(mut self, utility: Option<String>) -> Self {
        self.config.require_utility = utility;
        self
    }

    pub fn build(self) -> RunConfig {
        self.config
    }
}
