use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::builtin::{AlertingComponent, LoggingComponent, MonitoringComponent};
use super::{Component, ComponentError, ComponentInfo, ComponentResult, ComponentState};

/// Builds a component instance with the given instance name
pub type ComponentFactory = Arc<dyn Fn(&str) -> Box<dyn Component> + Send + Sync>;

/// A live component instance
pub type SharedComponent = Arc<Mutex<Box<dyn Component>>>;

/// Named component types and the running instances created from them
#[derive(Default)]
pub struct ComponentRegistry {
    factories: RwLock<BTreeMap<String, ComponentFactory>>,
    components: RwLock<BTreeMap<String, SharedComponent>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built-in types and create one instance of each
    pub async fn load_components(&self) -> ComponentResult<()> {
        self.register_component_type(LoggingComponent::TYPE_NAME, |name| {
            Box::new(LoggingComponent::new(name))
        })
        .await;
        self.register_component_type(AlertingComponent::TYPE_NAME, |name| {
            Box::new(AlertingComponent::new(name))
        })
        .await;
        self.register_component_type(MonitoringComponent::TYPE_NAME, |name| {
            Box::new(MonitoringComponent::new(name))
        })
        .await;

        for type_name in [
            LoggingComponent::TYPE_NAME,
            AlertingComponent::TYPE_NAME,
            MonitoringComponent::TYPE_NAME,
        ] {
            if !self.components.read().await.contains_key(type_name) {
                self.create_component(type_name, type_name).await?;
            }
        }
        Ok(())
    }

    pub async fn register_component_type<F>(&self, type_name: &str, factory: F)
    where
        F: Fn(&str) -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.factories
            .write()
            .await
            .insert(type_name.to_string(), Arc::new(factory));
    }

    async fn build(&self, type_name: &str, instance_name: &str) -> ComponentResult<SharedComponent> {
        let factories = self.factories.read().await;
        let factory = factories
            .get(type_name)
            .ok_or_else(|| ComponentError::UnknownType(type_name.to_string()))?;
        Ok(Arc::new(Mutex::new(factory(instance_name))))
    }

    pub async fn create_component(&self, type_name: &str, instance_name: &str) -> ComponentResult<()> {
        let component = self.build(type_name, instance_name).await?;

        let mut components = self.components.write().await;
        if components.contains_key(instance_name) {
            return Err(ComponentError::AlreadyExists(instance_name.to_string()));
        }
        components.insert(instance_name.to_string(), component);
        info!("🧩 Created component '{}' of type '{}'", instance_name, type_name);
        Ok(())
    }

    /// Swap an instance for a fresh one of `new_type`. The old instance is
    /// stopped first when running and kept when `new_type` is unknown.
    pub async fn replace_component(&self, instance_name: &str, new_type: &str) -> ComponentResult<()> {
        let old = self.get_component(instance_name).await?;
        let replacement = self.build(new_type, instance_name).await?;

        {
            let mut old = old.lock().await;
            if old.state() == ComponentState::Running {
                if let Err(e) = old.stop().await {
                    warn!("Stopping replaced component '{}' failed: {}", instance_name, e);
                }
            }
        }

        self.components
            .write()
            .await
            .insert(instance_name.to_string(), replacement);
        info!("🔄 Replaced component '{}' with type '{}'", instance_name, new_type);
        Ok(())
    }

    pub async fn start_component(&self, instance_name: &str) -> ComponentResult<()> {
        let component = self.get_component(instance_name).await?;
        let mut component = component.lock().await;
        component.start().await?;
        info!("▶️ Started component '{}'", instance_name);
        Ok(())
    }

    pub async fn stop_component(&self, instance_name: &str) -> ComponentResult<()> {
        let component = self.get_component(instance_name).await?;
        let mut component = component.lock().await;
        component.stop().await?;
        info!("⏹️ Stopped component '{}'", instance_name);
        Ok(())
    }

    pub async fn restart_component(&self, instance_name: &str) -> ComponentResult<()> {
        let component = self.get_component(instance_name).await?;
        let mut component = component.lock().await;
        if component.state() == ComponentState::Running {
            component.stop().await?;
        }
        component.start().await
    }

    /// Remove an instance, stopping it first when running
    pub async fn remove_component(&self, instance_name: &str) -> ComponentResult<()> {
        let component = self
            .components
            .write()
            .await
            .remove(instance_name)
            .ok_or_else(|| ComponentError::UnknownComponent(instance_name.to_string()))?;

        let mut component = component.lock().await;
        if component.state() == ComponentState::Running {
            if let Err(e) = component.stop().await {
                warn!("Stopping removed component '{}' failed: {}", instance_name, e);
            }
        }
        info!("Removed component '{}'", instance_name);
        Ok(())
    }

    pub async fn get_component(&self, instance_name: &str) -> ComponentResult<SharedComponent> {
        self.components
            .read()
            .await
            .get(instance_name)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownComponent(instance_name.to_string()))
    }

    pub async fn list_components(&self) -> Vec<ComponentInfo> {
        let components: Vec<SharedComponent> =
            self.components.read().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(components.len());
        for component in components {
            infos.push(component.lock().await.info());
        }
        infos
    }

    pub async fn list_component_types(&self) -> Vec<String> {
        self.factories.read().await.keys().cloned().collect()
    }

    pub async fn health_check(&self, instance_name: &str) -> ComponentResult<bool> {
        let component = self.get_component(instance_name).await?;
        let healthy = component.lock().await.health_check().await;
        Ok(healthy)
    }

    pub async fn health_check_all(&self) -> BTreeMap<String, bool> {
        let components: Vec<(String, SharedComponent)> = self
            .components
            .read()
            .await
            .iter()
            .map(|(name, component)| (name.clone(), Arc::clone(component)))
            .collect();

        let mut results = BTreeMap::new();
        for (name, component) in components {
            let healthy = component.lock().await.health_check().await;
            results.insert(name, healthy);
        }
        results
    }

    pub async fn get_component_count(&self) -> usize {
        self.components.read().await.len()
    }

    pub async fn component_names(&self) -> Vec<String> {
        self.components.read().await.keys().cloned().collect()
    }
}
