//! REST implementation of [`EntityGateway`].

use crate::transport::HttpTransport;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tradedesk_core::{
    classify, decode_entities, decode_entity, ensure_same_tenant, require_tenant, Entity,
    EntityAction, EntityGateway, EntityId, ListQuery, Page, TenantId, TenantSource, TradeError,
    TradeResult, TransportError,
};

/// Gateway for one entity collection, e.g. `/vendors`.
pub struct RestGateway<E> {
    transport: HttpTransport,
    tenant: Arc<dyn TenantSource>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for RestGateway<E> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            tenant: Arc::clone(&self.tenant),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for RestGateway<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestGateway")
            .field("kind", &E::KIND)
            .field("base_url", &self.transport.base_url())
            .finish()
    }
}

impl<E: Entity> RestGateway<E> {
    pub fn new(transport: HttpTransport, tenant: Arc<dyn TenantSource>) -> Self {
        Self {
            transport,
            tenant,
            _entity: PhantomData,
        }
    }

    fn tenant(&self) -> TradeResult<TenantId> {
        require_tenant(self.tenant.as_ref()).map_err(|err| {
            tracing::warn!(kind = %E::KIND, "request rejected without tenant context");
            TradeError::from(err)
        })
    }

    fn collection_path(&self) -> &'static str {
        E::KIND.resource_path()
    }

    fn item_path(&self, id: &EntityId) -> String {
        format!("{}/{}", self.collection_path(), id)
    }

    async fn call(
        &self,
        method: Method,
        tenant_id: TenantId,
        path: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> TradeResult<Value> {
        self.transport
            .send(method, tenant_id, path, query, body)
            .await
            .map_err(|err| TradeError::Api(classify(err)))
    }

    fn owned(&self, tenant_id: TenantId, entity: E) -> TradeResult<E> {
        ensure_same_tenant(tenant_id, entity.tenant_id())?;
        Ok(entity)
    }
}

fn to_body<T: Serialize>(payload: &T) -> TradeResult<Value> {
    serde_json::to_value(payload).map_err(|e| {
        TradeError::Api(classify(TransportError::Decode {
            message: e.to_string(),
        }))
    })
}

fn decoded<T>(result: Result<T, TransportError>) -> TradeResult<T> {
    result.map_err(|err| TradeError::Api(classify(err)))
}

#[async_trait]
impl<E: Entity> EntityGateway<E> for RestGateway<E> {
    async fn list(&self, query: &ListQuery) -> TradeResult<Page<E>> {
        let tenant_id = self.tenant()?;
        let value = self
            .call(
                Method::GET,
                tenant_id,
                self.collection_path(),
                &query.to_pairs(),
                None,
            )
            .await?;
        let page = decoded(Page::<E>::from_value(value))?;
        for item in &page.data {
            ensure_same_tenant(tenant_id, item.tenant_id())?;
        }
        Ok(page)
    }

    async fn get(&self, id: &EntityId) -> TradeResult<E> {
        let tenant_id = self.tenant()?;
        let value = self
            .call(Method::GET, tenant_id, &self.item_path(id), &[], None)
            .await?;
        self.owned(tenant_id, decoded(decode_entity(value))?)
    }

    async fn create(&self, draft: &E::Draft) -> TradeResult<E> {
        let tenant_id = self.tenant()?;
        let body = to_body(draft)?;
        let value = self
            .call(
                Method::POST,
                tenant_id,
                self.collection_path(),
                &[],
                Some(&body),
            )
            .await?;
        self.owned(tenant_id, decoded(decode_entity(value))?)
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> TradeResult<E> {
        let tenant_id = self.tenant()?;
        let body = to_body(patch)?;
        let value = self
            .call(Method::PUT, tenant_id, &self.item_path(id), &[], Some(&body))
            .await?;
        self.owned(tenant_id, decoded(decode_entity(value))?)
    }

    async fn delete(&self, id: &EntityId) -> TradeResult<()> {
        let tenant_id = self.tenant()?;
        self.call(Method::DELETE, tenant_id, &self.item_path(id), &[], None)
            .await?;
        Ok(())
    }

    async fn bulk_update(&self, ids: &[EntityId], patch: &E::Patch) -> TradeResult<Vec<E>> {
        let tenant_id = self.tenant()?;
        let mut body = to_body(patch)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("ids".to_string(), to_body(&ids)?);
        }
        let path = format!("{}/bulk-update", self.collection_path());
        let value = self
            .call(Method::POST, tenant_id, &path, &[], Some(&body))
            .await?;
        let entities: Vec<E> = decoded(decode_entities(value))?;
        for entity in &entities {
            ensure_same_tenant(tenant_id, entity.tenant_id())?;
        }
        Ok(entities)
    }

    async fn perform(&self, id: &EntityId, action: &E::Action) -> TradeResult<E> {
        let tenant_id = self.tenant()?;
        let path = format!("{}/{}", self.item_path(id), action.segment());
        let body = action.body();
        let value = self
            .call(Method::POST, tenant_id, &path, &[], Some(&body))
            .await?;
        self.owned(tenant_id, decoded(decode_entity(value))?)
    }
}
