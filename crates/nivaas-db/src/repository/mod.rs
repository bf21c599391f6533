//! SurrealDB repository implementations.

mod audit;
mod organization;
mod payment;
mod room;
mod subscription;
mod tenant;

pub use audit::SurrealAuditLogRepository;
pub use organization::SurrealOrganizationRepository;
pub use payment::SurrealPaymentRepository;
pub use room::SurrealRoomRepository;
pub use subscription::SurrealSubscriptionRepository;
pub use tenant::SurrealTenantRepository;
