pub mod catalog;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod meta;
pub mod playlist;
pub mod scan;
pub mod state;
pub mod processing {
    pub mod blur;
    pub mod layout;
    pub mod orientation;
    pub mod pairing;
    pub mod prepare;
    pub mod resize;
}
pub mod tasks {
    pub mod keyboard;
    pub mod mqtt;
    pub mod viewer;
}
