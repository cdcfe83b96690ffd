//! 错误到消息标识的映射
//!
//! 按具体错误类型登记标识；查找时从最外层错误开始沿 cause 链逐层匹配，至多 20 层。
//!
use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;

const MAX_DEPTH: usize = 20;

struct Mapping<T> {
    type_id: TypeId,
    matches: fn(&(dyn StdError + 'static)) -> bool,
    value: T,
}

pub struct ErrorMapping<T> {
    mappings: Vec<Mapping<T>>,
}

impl<T> Default for ErrorMapping<T> {
    fn default() -> Self {
        Self {
            mappings: Vec::new(),
        }
    }
}

impl<T: Clone> ErrorMapping<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记错误类型 `E` 的标识；重复登记时覆盖
    pub fn add_mapping<E: StdError + 'static>(mut self, value: T) -> Self {
        let type_id = TypeId::of::<E>();
        match self.mappings.iter_mut().find(|m| m.type_id == type_id) {
            Some(existing) => existing.value = value,
            None => self.mappings.push(Mapping {
                type_id,
                matches: is_error::<E>,
                value,
            }),
        }
        self
    }

    /// 沿 anyhow 错误链查找
    pub fn map_error(&self, error: &anyhow::Error) -> Option<T> {
        self.map_chain(error.chain(), error)
    }

    /// 沿 `source()` 链查找
    pub fn map_std_error(&self, error: &(dyn StdError + 'static)) -> Option<T> {
        let chain = std::iter::successors(Some(error), |e| (*e).source());
        self.map_chain(chain, &error)
    }

    /// 只匹配给定的这一层，不检查 cause
    pub fn map_error_flat(&self, error: &(dyn StdError + 'static)) -> Option<T> {
        self.mappings
            .iter()
            .find(|mapping| (mapping.matches)(error))
            .map(|mapping| mapping.value.clone())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn map_chain<'a>(
        &self,
        chain: impl Iterator<Item = &'a (dyn StdError + 'static)>,
        error: &dyn fmt::Display,
    ) -> Option<T> {
        let found = chain
            .take(MAX_DEPTH)
            .find_map(|cause| self.map_error_flat(cause));
        if found.is_none() {
            tracing::debug!(target: "eventbus", "No specific message id found for {error}");
        }
        found
    }
}

fn is_error<E: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("network unreachable")]
    struct Offline;

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct RequestFailed {
        #[source]
        source: Offline,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn finds_mapped_causes_along_the_chain() {
        let mapping = ErrorMapping::new()
            .add_mapping::<Offline>("error.offline")
            .add_mapping::<DiskFull>("error.disk");

        let error = anyhow::Error::new(RequestFailed { source: Offline }).context("sync");
        assert_eq!(mapping.map_error(&error), Some("error.offline"));
        assert_eq!(mapping.map_error(&anyhow::Error::new(DiskFull)), Some("error.disk"));
        assert_eq!(mapping.map_error(&anyhow::anyhow!("plain")), None);

        let std_error = RequestFailed { source: Offline };
        assert_eq!(mapping.map_std_error(&std_error), Some("error.offline"));
        assert_eq!(mapping.map_error_flat(&std_error), None);
    }

    #[test]
    fn later_registration_overrides_and_outer_types_win() {
        let mapping = ErrorMapping::new()
            .add_mapping::<Offline>(1)
            .add_mapping::<RequestFailed>(2)
            .add_mapping::<Offline>(3);
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.map_std_error(&RequestFailed { source: Offline }),
            Some(2)
        );
        assert_eq!(mapping.map_std_error(&Offline), Some(3));
    }

    #[test]
    fn stops_after_twenty_levels() {
        let mapping = ErrorMapping::new().add_mapping::<Offline>("offline");
        // 第 20 层仍可命中，第 21 层不再检查
        assert_eq!(mapping.map_std_error(&RequestWrapper::wrap(18)), Some("offline"));
        assert_eq!(mapping.map_std_error(&RequestWrapper::wrap(19)), None);

        let error = anyhow::Error::new(RequestWrapper::wrap(19));
        assert_eq!(mapping.map_error(&error), None);
    }

    #[derive(Debug, thiserror::Error)]
    enum RequestWrapper {
        #[error("wrapped")]
        Wrapped(#[source] Box<RequestWrapper>),
        #[error("leaf")]
        Leaf(#[source] Offline),
    }

    impl RequestWrapper {
        fn wrap(levels: usize) -> Self {
            (0..levels).fold(Self::Leaf(Offline), |inner, _| {
                Self::Wrapped(Box::new(inner))
            })
        }
    }
}
