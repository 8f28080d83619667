use crate::core::models::Channel;

/// The known channels of the remote source, refreshed only by channel-listing
/// sync. Message operations never mutate it.
#[derive(Debug, Default, Clone)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
}

impl ChannelCatalog {
    pub fn replace(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
    }

    #[must_use]
    pub fn members(&self) -> Vec<Channel> {
        self.channels.iter().filter(|c| c.is_member).cloned().collect()
    }

    #[must_use]
    pub fn non_members(&self) -> Vec<Channel> {
        self.channels.iter().filter(|c| !c.is_member).cloned().collect()
    }
}
