mod client;
mod provider;
mod schedule;
mod types;


pub use provider::GitHubProvider;
