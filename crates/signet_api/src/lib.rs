pub mod handlers;
pub mod routes;

use signet_service::ContractService;

#[derive(Clone)]
pub struct AppState {
    pub service: ContractService,
}
