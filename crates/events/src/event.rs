use stockledger_core::TenantId;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **routed** by topic, with a partition key that keeps related events together
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/topic (e.g. "inventory.reserved").
    fn event_type(&self) -> &'static str;

    /// Tenant the event belongs to.
    fn tenant_id(&self) -> &TenantId;

    /// Key used by partitioned transports; events with the same key stay ordered.
    fn partition_key(&self) -> String;
}
