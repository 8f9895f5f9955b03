//! User commands - one directory operation per invocation

use anyhow::anyhow;
use clap::Args;
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::query::{PageRequest, SortDirection};
use crate::domain::user::{NewUser, UserChanges, UserId};
use crate::domain::DomainError;
use crate::infrastructure::bootstrap;

/// Arguments for the list command
#[derive(Args, Clone, Debug)]
pub struct ListArgs {
    /// Case-insensitive substring of the name
    #[arg(long)]
    pub search: Option<String>,

    /// Only active (true) or disabled (false) users
    #[arg(long)]
    pub status: Option<bool>,

    /// Order by id: asc or desc
    #[arg(long)]
    pub sort: Option<SortDirection>,

    #[arg(long)]
    pub page: Option<u64>,

    #[arg(long)]
    pub page_size: Option<u64>,

    /// Extra query parameter as key=value; repeatable
    #[arg(long, value_parser = parse_param)]
    pub param: Vec<(String, String)>,
}

impl ListArgs {
    pub fn to_request(&self) -> PageRequest {
        let mut request = PageRequest::new();

        if let Some(search) = &self.search {
            request = request.with_search(search.clone());
        }
        if let Some(status) = self.status {
            request = request.with_status(status);
        }
        if let Some(sort) = self.sort {
            request = request.with_sort(sort);
        }
        if let Some(page) = self.page {
            request = request.with_page(page);
        }
        if let Some(page_size) = self.page_size {
            request = request.with_page_size(page_size);
        }

        for (key, value) in &self.param {
            request = request.with_param(key.clone(), value.clone());
        }

        request
    }
}

#[derive(Args, Clone, Debug)]
pub struct IdArgs {
    pub id: i64,
}

#[derive(Args, Clone, Debug)]
pub struct CreateArgs {
    pub name: String,

    /// Create the user disabled
    #[arg(long)]
    pub inactive: bool,
}

#[derive(Args, Clone, Debug)]
pub struct UpdateArgs {
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub status: Option<bool>,
}

impl UpdateArgs {
    pub fn to_changes(&self) -> UserChanges {
        UserChanges {
            name: self.name.clone(),
            status: self.status,
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Attaches the stable error class so scripts can branch on it
fn classify(error: DomainError) -> anyhow::Error {
    anyhow!("{} [{}]", error, error.class())
}

pub async fn list(config: &AppConfig, args: ListArgs) -> anyhow::Result<()> {
    let services = bootstrap::build_services(config).await?;
    let page = services
        .directory
        .list(&args.to_request())
        .await
        .map_err(classify)?;

    print_json(&page)
}

pub async fn get(config: &AppConfig, args: IdArgs) -> anyhow::Result<()> {
    let services = bootstrap::build_services(config).await?;
    let user = services
        .directory
        .get(UserId::new(args.id))
        .await
        .map_err(classify)?;

    print_json(&user)
}

pub async fn create(config: &AppConfig, args: CreateArgs) -> anyhow::Result<()> {
    let services = bootstrap::build_services(config).await?;
    let user = services
        .directory
        .create(NewUser::new(args.name).with_status(!args.inactive))
        .await
        .map_err(classify)?;

    print_json(&user)
}

pub async fn update(config: &AppConfig, args: UpdateArgs) -> anyhow::Result<()> {
    let services = bootstrap::build_services(config).await?;
    let user = services
        .directory
        .update(UserId::new(args.id), args.to_changes())
        .await
        .map_err(classify)?;

    print_json(&user)
}

pub async fn delete(config: &AppConfig, args: IdArgs) -> anyhow::Result<()> {
    let services = bootstrap::build_services(config).await?;
    services
        .directory
        .delete(UserId::new(args.id))
        .await
        .map_err(classify)?;

    print_json(&serde_json::json!({ "deleted": args.id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("tenant=acme"),
            Ok(("tenant".to_string(), "acme".to_string()))
        );
        assert_eq!(parse_param("q=a=b"), Ok(("q".to_string(), "a=b".to_string())));
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_list_args_to_request() {
        let args = ListArgs {
            search: Some("al".to_string()),
            status: Some(true),
            sort: Some(SortDirection::Asc),
            page: Some(2),
            page_size: Some(5),
            param: vec![("tenant".to_string(), "acme".to_string())],
        };

        let request = args.to_request();

        assert_eq!(request.search(), Some("al"));
        assert_eq!(request.status(), Some(true));
        assert_eq!(request.sort(), SortDirection::Asc);
        assert_eq!(request.page(), Some(2));
        assert_eq!(request.page_size(), Some(5));
        assert_eq!(request.params().first("tenant"), Some("acme"));
    }

    #[test]
    fn test_update_args_to_changes() {
        let args = UpdateArgs {
            id: 3,
            name: None,
            status: Some(false),
        };

        assert_eq!(args.to_changes(), UserChanges::new().with_status(false));
    }
}
