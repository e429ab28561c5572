mod containers;
mod hosts;

pub use containers::{ContainerRecord, ContainerStore};
pub use hosts::HostStore;
