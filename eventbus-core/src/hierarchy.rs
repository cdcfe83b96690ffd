//! 事件类型层级解析
//!
//! 给定具体事件类型，按如下顺序展开其可赋值的全部类型：
//! 自身 → 自身的接口（递归、去重）→ 父类型 → 父类型的接口 → …… 直至父链结束。
//! 每个结果附带从具体类型视图到该类型视图的投影路径。
//!
//! 解析结果按具体类型在进程内缓存，仅依赖类型本身，与总线实例无关。
//!
use crate::event::{EventAny, EventType, Projection, Supertype, SupertypeKind};
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

static RESOLVED: LazyLock<DashMap<TypeId, Arc<[ResolvedType]>>> = LazyLock::new(DashMap::new);

/// 解析出的可赋值类型
#[derive(Clone, Debug)]
pub struct ResolvedType {
    ty: EventType,
    path: Vec<Projection>,
}

impl ResolvedType {
    pub fn event_type(&self) -> EventType {
        self.ty
    }

    /// 将具体类型视图投影为该类型视图
    pub fn apply<'a>(&self, event: &'a EventAny) -> Option<&'a EventAny> {
        self.path
            .iter()
            .try_fold(event, |view, project| project(view))
    }
}

/// 解析具体类型可赋值的全部类型（首项为自身）
pub fn resolve(concrete: EventType) -> Arc<[ResolvedType]> {
    if let Some(types) = RESOLVED.get(&concrete.id()).map(|t| t.clone()) {
        return types;
    }
    let types: Arc<[ResolvedType]> = collect(concrete).into();
    RESOLVED.insert(concrete.id(), types.clone());
    types
}

/// 将具体类型的事件投影为目标类型视图
pub fn project<'a>(
    event: &'a EventAny,
    concrete: EventType,
    target: TypeId,
) -> Option<&'a EventAny> {
    if concrete.id() == target {
        return Some(event);
    }
    resolve(concrete)
        .iter()
        .find(|resolved| resolved.ty.id() == target)?
        .apply(event)
}

/// 清空进程内缓存
pub fn clear_cache() {
    RESOLVED.clear();
}

fn collect(concrete: EventType) -> Vec<ResolvedType> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some((concrete, Vec::new()));

    while let Some((ty, path)) = current.take() {
        // 父链成环时终止
        if !seen.insert(ty.id()) {
            break;
        }
        resolved.push(ResolvedType {
            ty,
            path: path.clone(),
        });

        let mut parent = None;
        let mut interfaces = Vec::new();
        for supertype in ty.supertypes() {
            match supertype.kind() {
                SupertypeKind::Parent if parent.is_none() => parent = Some(supertype),
                _ => interfaces.push(supertype),
            }
        }
        add_interfaces(&mut resolved, &mut seen, &interfaces, &path);

        current = parent.map(|p| (p.event_type(), extend(&path, p.projection())));
    }
    resolved
}

fn add_interfaces(
    resolved: &mut Vec<ResolvedType>,
    seen: &mut HashSet<TypeId>,
    interfaces: &[Supertype],
    path: &[Projection],
) {
    for interface in interfaces {
        if seen.insert(interface.event_type().id()) {
            let path = extend(path, interface.projection());
            resolved.push(ResolvedType {
                ty: interface.event_type(),
                path: path.clone(),
            });
            add_interfaces(resolved, seen, &interface.event_type().supertypes(), &path);
        }
    }
}

fn extend(path: &[Projection], next: Projection) -> Vec<Projection> {
    let mut extended = Vec::with_capacity(path.len() + 1);
    extended.extend_from_slice(path);
    extended.push(next);
    extended
}
