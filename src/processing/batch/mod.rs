mod processor;

pub use processor::FolderPipeline;
