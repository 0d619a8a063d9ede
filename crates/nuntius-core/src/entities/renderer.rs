//! 渲染器配置
//!
//! 指定渲染引擎及其配置。模板通过引擎标识与渲染器关联。名称按原样保存。

use serde::{Deserialize, Serialize};

use super::{ConfigurationEntity, IdentifierChecks, normalize_engine_id};
use crate::models::ElementStatus;
use crate::status::Lifecycle;
use crate::validation::{ValidationOutcome, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Renderer {
    id: String,
    name: String,
    engine_id: String,
    settings: String,
    status: ElementStatus,
}

impl Renderer {
    pub const NAME_MAX_LEN: usize = 200;

    pub fn create(
        id: &str,
        name: &str,
        engine_id: &str,
        settings: &str,
    ) -> Result<Self, ValidationOutcome> {
        Self::validate(id, name, engine_id, settings).into_result(|| Self {
            id: id.to_string(),
            name: name.to_string(),
            engine_id: normalize_engine_id(engine_id),
            settings: settings.to_string(),
            status: ElementStatus::Enabled,
        })
    }

    pub fn update(&mut self, name: &str, engine_id: &str, settings: &str) -> ValidationOutcome {
        self.validate_enabled()
            .then(|| Self::validate(&self.id, name, engine_id, settings))
            .if_success(|| {
                self.name = name.to_string();
                self.engine_id = normalize_engine_id(engine_id);
                self.settings = settings.to_string();
            })
    }

    fn validate(id: &str, name: &str, engine_id: &str, settings: &str) -> ValidationOutcome {
        Validator::new()
            .field("id", id)
            .valid_id()
            .field("name", name)
            .required()
            .max_len(Self::NAME_MAX_LEN)
            .field("engine_id", engine_id)
            .valid_id()
            .field("settings", settings)
            .valid_json()
            .finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &str {
        &self.settings
    }
}

impl Lifecycle for Renderer {
    fn status(&self) -> ElementStatus {
        self.status
    }

    fn status_mut(&mut self) -> &mut ElementStatus {
        &mut self.status
    }
}

impl ConfigurationEntity for Renderer {
    const KIND: &'static str = "Renderer";

    fn id(&self) -> &str {
        &self.id
    }

    fn engine_id(&self) -> &str {
        &self.engine_id
    }
}

impl PartialEq for Renderer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Renderer {}
