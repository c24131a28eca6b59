//! Composite CRUD pipeline
//!
//! `Crud<H>` exposes the DAO operation surface but delegates each operation to
//! an `on_*` hook of a `CrudHandler`, after running the handler's `validate`.
//! Handlers implement only the hooks they support; the rest reject with
//! `NotImplemented`.

use async_trait::async_trait;
use tracing::error;

use crate::connection::DbConnection;
use crate::dao::RemoveResult;
use crate::error::{DataError, Result};
use crate::query::{Clauses, Conditions, DataObject};
use crate::types::ActionType;

fn not_implemented(operation: &str) -> DataError {
    DataError::not_implemented(format!("{} is not supported", operation))
}

/// Business logic behind a `Crud`
#[async_trait]
pub trait CrudHandler: Send + Sync {
    /// Validate and optionally normalize the input of an operation
    async fn validate(
        &self,
        _action: ActionType,
        data: DataObject,
        _conditions: &Conditions,
    ) -> Result<DataObject> {
        Ok(data)
    }

    async fn on_read(
        &self,
        _cn: &DbConnection,
        _conditions: &Conditions,
        _columns: Option<&[String]>,
        _clauses: &Clauses,
    ) -> Result<Vec<DataObject>> {
        Err(not_implemented("read"))
    }

    async fn on_read_one(
        &self,
        _cn: &DbConnection,
        _conditions: &Conditions,
        _columns: Option<&[String]>,
    ) -> Result<Option<DataObject>> {
        Err(not_implemented("readOne"))
    }

    async fn on_add(&self, _cn: &DbConnection, _data: DataObject) -> Result<DataObject> {
        Err(not_implemented("add"))
    }

    async fn on_remove(
        &self,
        _cn: &DbConnection,
        _conditions: &Conditions,
        _limit: Option<u64>,
    ) -> Result<RemoveResult> {
        Err(not_implemented("remove"))
    }

    async fn on_remove_one(
        &self,
        _cn: &DbConnection,
        _conditions: &Conditions,
    ) -> Result<RemoveResult> {
        Err(not_implemented("removeOne"))
    }

    async fn on_modify(
        &self,
        _cn: &DbConnection,
        _data: DataObject,
        _conditions: &Conditions,
        _limit: Option<u64>,
    ) -> Result<Option<DataObject>> {
        Err(not_implemented("modify"))
    }

    async fn on_merge(
        &self,
        _cn: &DbConnection,
        _data: DataObject,
        _conditions: &Conditions,
        _limit: Option<u64>,
    ) -> Result<DataObject> {
        Err(not_implemented("merge"))
    }
}

/// Validate → hook pipeline over a `CrudHandler`
#[derive(Debug, Clone)]
pub struct Crud<H> {
    name: String,
    handler: H,
}

impl<H: CrudHandler> Crud<H> {
    pub fn new(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    async fn validate(
        &self,
        action: ActionType,
        data: DataObject,
        conditions: &Conditions,
    ) -> Result<DataObject> {
        self.handler
            .validate(action, data, conditions)
            .await
            .map_err(|e| self.log(action, e))
    }

    /// Log the errors this layer owns; hook errors from DAOs are already logged
    fn finish<T>(&self, action: ActionType, result: Result<T>) -> Result<T> {
        result.map_err(|e| match e {
            DataError::NotImplemented(_) => self.log(action, e),
            other => other,
        })
    }

    fn log(&self, action: ActionType, err: DataError) -> DataError {
        error!(
            crud = %self.name,
            action = action.as_str(),
            code = err.code(),
            error = %err,
            "CRUD operation rejected"
        );
        err
    }

    pub async fn read(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        columns: Option<&[String]>,
        clauses: &Clauses,
    ) -> Result<Vec<DataObject>> {
        self.validate(ActionType::Read, DataObject::new(), conditions)
            .await?;
        let result = self.handler.on_read(cn, conditions, columns, clauses).await;
        self.finish(ActionType::Read, result)
    }

    pub async fn read_one(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        columns: Option<&[String]>,
    ) -> Result<Option<DataObject>> {
        self.validate(ActionType::Read, DataObject::new(), conditions)
            .await?;
        let result = self.handler.on_read_one(cn, conditions, columns).await;
        self.finish(ActionType::Read, result)
    }

    pub async fn add(&self, cn: &DbConnection, data: DataObject) -> Result<DataObject> {
        let data = self
            .validate(ActionType::Add, data, &Conditions::new())
            .await?;
        let result = self.handler.on_add(cn, data).await;
        self.finish(ActionType::Add, result)
    }

    pub async fn remove(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<RemoveResult> {
        self.validate(ActionType::Remove, DataObject::new(), conditions)
            .await?;
        let result = self.handler.on_remove(cn, conditions, limit).await;
        self.finish(ActionType::Remove, result)
    }

    pub async fn remove_one(
        &self,
        cn: &DbConnection,
        conditions: &Conditions,
    ) -> Result<RemoveResult> {
        self.validate(ActionType::Remove, DataObject::new(), conditions)
            .await?;
        let result = self.handler.on_remove_one(cn, conditions).await;
        self.finish(ActionType::Remove, result)
    }

    pub async fn modify(
        &self,
        cn: &DbConnection,
        data: DataObject,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<Option<DataObject>> {
        let data = self.validate(ActionType::Modify, data, conditions).await?;
        let result = self.handler.on_modify(cn, data, conditions, limit).await;
        self.finish(ActionType::Modify, result)
    }

    pub async fn merge(
        &self,
        cn: &DbConnection,
        data: DataObject,
        conditions: &Conditions,
        limit: Option<u64>,
    ) -> Result<DataObject> {
        let data = self.validate(ActionType::Merge, data, conditions).await?;
        let result = self.handler.on_merge(cn, data, conditions, limit).await;
        self.finish(ActionType::Merge, result)
    }
}
