#![allow(dead_code)]

use remex_cas::{CasClient, MemoryByteStore};
use remex_core::{Command as CommandMessage, Digest};
use remex_exec::testing::ScriptedExecutionService;
use remex_exec::Client;
use std::sync::Arc;

pub const INSTANCE: &str = "ci";

pub struct Harness {
    pub store: Arc<MemoryByteStore>,
    pub service: Arc<ScriptedExecutionService>,
    pub client: Client,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_service(ScriptedExecutionService::new())
    }

    pub fn with_service(service: ScriptedExecutionService) -> Self {
        let store = Arc::new(MemoryByteStore::new());
        let service = Arc::new(service);
        let client = Client::new(CasClient::new(store.clone()), service.clone());
        Self {
            store,
            service,
            client,
        }
    }

    pub async fn prepare(&self, name: &str, args: &[&str]) -> remex_exec::Command {
        self.client
            .prepare_command(
                INSTANCE,
                name,
                Digest::of(b""),
                &CommandMessage::new(args.iter().copied()),
            )
            .await
            .unwrap()
    }
}
