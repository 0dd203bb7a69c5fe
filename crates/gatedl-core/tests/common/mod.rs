pub mod forum_server;
