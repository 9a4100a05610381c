//! formrepl - Replicate Common Form documents from a remote form server
//!
//! A [`replication::Replicator`] registers an HTTP callback with the form
//! server, lists every digest the server already holds, and fetches and
//! validates each form, reporting progress as [`replication::ReplicationEvent`]s.

pub mod cli;
pub mod http_server;
pub mod observability;
pub mod replication;
