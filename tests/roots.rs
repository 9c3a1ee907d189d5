//! Integration tests for root accounting

use ibgib_space::ibgib::Data;
use ibgib_space::persist::persist_transform_result;
use ibgib_space::roots::{CURRENT_ROOT_REL8N_NAME, ROOT_REL8N_NAME};
use ibgib_space::space::InMemorySpace;
use ibgib_space::transform::{first_gen, TjpOptions, TransformOptions};
use ibgib_space::{IbGib, NoBootstrap, SpaceContext, SpecialType};
use serde_json::json;
use std::sync::Arc;

async fn new_context() -> SpaceContext {
    SpaceContext::create(
        "test",
        Arc::new(InMemorySpace::new("space")),
        Arc::new(InMemorySpace::new("zero")),
        Arc::new(NoBootstrap),
    )
    .await
    .unwrap()
}

async fn comment(ctx: &SpaceContext, text: &str) -> IbGib {
    let data: Data = json!({ "text": text }).as_object().cloned().unwrap();
    let result = first_gen(
        &IbGib::primitive("comment"),
        format!("comment {}", text),
        data,
        Some(TjpOptions::full()),
        TransformOptions::default(),
    )
    .unwrap();
    persist_transform_result(ctx.space(), &result, false, false).await.unwrap();
    result.new_ibgib
}

#[tokio::test]
async fn test_roots_created_on_demand() {
    let ctx = new_context().await;
    let current = ctx.get_current_root().await.unwrap();
    assert_eq!(current.ib, "root Aroot");

    let roots = ctx.get_special_rel8d_ibgibs(SpecialType::Roots, ROOT_REL8N_NAME).await.unwrap();
    let ibs: Vec<&str> = roots.iter().map(|r| r.ib.as_str()).collect();
    assert_eq!(
        ibs,
        vec!["root Aroot", "root Broot", "root Croot", "root Droot", "root Eroot", "root Froot", "root Groot"]
    );

    let index = ctx.get_special_ibgib(SpecialType::Roots, false).await.unwrap().unwrap();
    assert_eq!(index.rel8d(CURRENT_ROOT_REL8N_NAME), &[current.addr()]);
}

#[tokio::test]
async fn test_rel8_to_current_root_files_node() {
    let ctx = new_context().await;
    let before = ctx.get_current_root().await.unwrap();
    let note = comment(&ctx, "filed").await;

    ctx.rel8_to_current_root(&note, None, false).await.unwrap();
    let after = ctx.get_current_root().await.unwrap();
    assert_ne!(after.addr(), before.addr());
    assert!(after.rel8d("x").contains(&note.addr()));
    assert_eq!(ctx.get_latest_addr(&before).await.unwrap(), Some(after.addr()));

    // already related: nothing changes
    ctx.rel8_to_current_root(&note, None, false).await.unwrap();
    assert_eq!(ctx.get_current_root().await.unwrap().addr(), after.addr());
}

#[tokio::test]
async fn test_rel8_to_current_root_linked_replaces() {
    let ctx = new_context().await;
    let first = comment(&ctx, "first").await;
    let second = comment(&ctx, "second").await;

    ctx.rel8_to_current_root(&first, Some("pinned"), true).await.unwrap();
    ctx.rel8_to_current_root(&second, Some("pinned"), true).await.unwrap();
    let current = ctx.get_current_root().await.unwrap();
    assert_eq!(current.rel8d("pinned"), &[second.addr()]);
}
