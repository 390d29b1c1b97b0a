mod load;
mod model;
mod parse;
mod topics;

pub use load::load_hierarchy;
pub use model::{ClusterHierarchy, ClusterNode, Level, SYNTHETIC_ROOT_ID};
pub use topics::{DirTopicSource, Topic, TopicFetchError, TopicSource, UnavailableTopicSource};

#[cfg(test)]
pub(crate) use model::fixtures;
