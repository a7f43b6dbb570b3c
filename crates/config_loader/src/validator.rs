//! 配置校验模块
//!
//! 校验规则：
//! - logger 名称、数据源 URL 非空
//! - 至少一个标签；tag_id 唯一且非空；display_name 非空
//! - 启用的 HTTP 导出器必须有 URL 与完整凭据
//! - 启用的文档存储必须有根目录
//! - 队列 / 通道容量 > 0

use std::collections::HashSet;

use contracts::{ContractError, HttpAuth, LoggerBlueprint};

/// 校验 LoggerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    validate_identity(blueprint)?;
    validate_tags(blueprint)?;
    validate_http_exporter(blueprint)?;
    validate_broadcast_exporter(blueprint)?;
    validate_document_store(blueprint)?;
    Ok(())
}

fn validate_identity(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    if blueprint.logger.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "logger.name",
            "logger name cannot be empty",
        ));
    }
    if blueprint.source.url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "source.url",
            "source url cannot be empty",
        ));
    }
    Ok(())
}

/// 校验标签表
fn validate_tags(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    if blueprint.tags.is_empty() {
        return Err(ContractError::config_validation(
            "tags",
            "at least one tag must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, tag) in blueprint.tags.iter().enumerate() {
        if tag.tag_id.is_empty() {
            return Err(ContractError::config_validation(
                format!("tags[{idx}].tag_id"),
                "tag_id cannot be empty",
            ));
        }
        if tag.display_name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("tags[tag_id={}].display_name", tag.tag_id),
                "display_name cannot be empty",
            ));
        }
        if !seen.insert(tag.tag_id.as_str()) {
            return Err(ContractError::config_validation(
                format!("tags[tag_id={}]", tag.tag_id),
                "duplicate tag_id",
            ));
        }
    }
    Ok(())
}

fn validate_http_exporter(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    let http = &blueprint.exporters.http;
    if !http.enabled {
        return Ok(());
    }

    if http.url.trim().is_empty() {
        return Err(ContractError::config_validation(
            "exporters.http.url",
            "url is required when the http exporter is enabled",
        ));
    }
    if !(http.url.starts_with("http://") || http.url.starts_with("https://")) {
        return Err(ContractError::config_validation(
            "exporters.http.url",
            format!("'{}' is not an http(s) url", http.url),
        ));
    }
    if http.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "exporters.http.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }

    match &http.auth {
        HttpAuth::None => Ok(()),
        HttpAuth::Basic { username, .. } if username.is_empty() => {
            Err(ContractError::config_validation(
                "exporters.http.auth.username",
                "basic auth requires a username",
            ))
        }
        HttpAuth::Basic { .. } => Ok(()),
        HttpAuth::Bearer { token } if token.is_empty() => Err(ContractError::config_validation(
            "exporters.http.auth.token",
            "bearer auth requires a token",
        )),
        HttpAuth::Bearer { .. } => Ok(()),
    }
}

fn validate_broadcast_exporter(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    let broadcast = &blueprint.exporters.broadcast;
    if broadcast.enabled && broadcast.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "exporters.broadcast.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_document_store(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    let store = &blueprint.exporters.document_store;
    if !store.enabled {
        return Ok(());
    }
    if store.base_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "exporters.document_store.base_path",
            "base_path is required when the document store is enabled",
        ));
    }
    if store.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "exporters.document_store.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}
