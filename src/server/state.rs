use crate::processor::DocumentProcessor;
use crate::settings::Settings;

pub struct ServerState<D, C> {
    pub settings: Settings,
    pub processor: DocumentProcessor<D, C>,
}
