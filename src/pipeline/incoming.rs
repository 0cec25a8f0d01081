//! Incoming pipeline composition.
//!
//! physical behaviors -> connector -> logical behaviors -> terminal
//!
//! The terminal (handler invocation) is supplied per call, so one pipeline
//! instance serves every envelope the receive loop dispatches.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::context::{IncomingLogicalMessageContext, IncomingPhysicalMessageContext};
use super::deserialize::DeserializeMessageConnector;
use super::stage::{Behavior, BehaviorChain, Next, StageConnector};
use crate::envelope::IncomingMessage;
use crate::observability::IncomingPipelineMetricTags;
use crate::registry::MessageMetadataLookup;
use crate::serialization::DeserializerResolver;
use crate::types::{PipelineConfig, Result};

type Connector =
    Arc<dyn StageConnector<IncomingPhysicalMessageContext, IncomingLogicalMessageContext>>;

pub struct IncomingPipeline {
    physical: BehaviorChain<IncomingPhysicalMessageContext>,
    connector: Connector,
    logical: BehaviorChain<IncomingLogicalMessageContext>,
}

impl fmt::Debug for IncomingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingPipeline")
            .field("physical", &self.physical)
            .field("logical", &self.logical)
            .finish_non_exhaustive()
    }
}

impl IncomingPipeline {
    pub fn builder(connector: Connector) -> IncomingPipelineBuilder {
        IncomingPipelineBuilder {
            physical: BehaviorChain::default(),
            connector,
            logical: BehaviorChain::default(),
        }
    }

    /// Pipeline with the deserialization connector and no extra behaviors.
    pub fn with_deserialization(
        config: &PipelineConfig,
        deserializer_resolver: Arc<dyn DeserializerResolver>,
        registry: Arc<dyn MessageMetadataLookup>,
    ) -> IncomingPipelineBuilder {
        Self::builder(Arc::new(DeserializeMessageConnector::from_config(
            config,
            deserializer_resolver,
            registry,
        )))
    }

    /// Run one envelope through the pipeline.
    pub async fn process(
        &self,
        context: IncomingPhysicalMessageContext,
        terminal: &dyn Next<IncomingLogicalMessageContext>,
    ) -> Result<()> {
        let logical = LogicalStage {
            behaviors: &self.logical,
            terminal,
        };
        let connector = ConnectorStage {
            connector: self.connector.as_ref(),
            next: &logical,
        };
        self.physical.invoke(context, &connector).await
    }

    /// Run one envelope with a fresh tag set and return the collected tags.
    pub async fn process_message(
        &self,
        message: IncomingMessage,
        terminal: &dyn Next<IncomingLogicalMessageContext>,
    ) -> Result<IncomingPipelineMetricTags> {
        let tags = IncomingPipelineMetricTags::new();
        let context = IncomingPhysicalMessageContext::new(message).with_metric_tags(tags.clone());
        self.process(context, terminal).await?;
        Ok(tags)
    }
}

pub struct IncomingPipelineBuilder {
    physical: BehaviorChain<IncomingPhysicalMessageContext>,
    connector: Connector,
    logical: BehaviorChain<IncomingLogicalMessageContext>,
}

impl fmt::Debug for IncomingPipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingPipelineBuilder")
            .field("physical", &self.physical)
            .field("logical", &self.logical)
            .finish_non_exhaustive()
    }
}

impl IncomingPipelineBuilder {
    /// Append a behavior that runs before deserialization.
    pub fn physical_behavior(
        mut self,
        behavior: Arc<dyn Behavior<IncomingPhysicalMessageContext>>,
    ) -> Self {
        self.physical.push(behavior);
        self
    }

    /// Append a behavior that runs once per logical message.
    pub fn logical_behavior(
        mut self,
        behavior: Arc<dyn Behavior<IncomingLogicalMessageContext>>,
    ) -> Self {
        self.logical.push(behavior);
        self
    }

    pub fn build(self) -> IncomingPipeline {
        IncomingPipeline {
            physical: self.physical,
            connector: self.connector,
            logical: self.logical,
        }
    }
}

struct ConnectorStage<'a> {
    connector:
        &'a dyn StageConnector<IncomingPhysicalMessageContext, IncomingLogicalMessageContext>,
    next: &'a dyn Next<IncomingLogicalMessageContext>,
}

#[async_trait]
impl<'a> Next<IncomingPhysicalMessageContext> for ConnectorStage<'a> {
    async fn run(&self, context: IncomingPhysicalMessageContext) -> Result<()> {
        self.connector.invoke(context, self.next).await
    }
}

struct LogicalStage<'a> {
    behaviors: &'a BehaviorChain<IncomingLogicalMessageContext>,
    terminal: &'a dyn Next<IncomingLogicalMessageContext>,
}

#[async_trait]
impl<'a> Next<IncomingLogicalMessageContext> for LogicalStage<'a> {
    async fn run(&self, context: IncomingLogicalMessageContext) -> Result<()> {
        self.behaviors.invoke(context, self.terminal).await
    }
}
