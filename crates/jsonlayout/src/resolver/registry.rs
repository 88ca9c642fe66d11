//! Name-keyed resolver factories.

use indexmap::IndexMap;

use crate::error::TemplateError;

/// Builds a resolver of type `R` from a compile context `C` and an optional
/// directive key. Unknown or missing keys are reported here.
pub(crate) type Factory<C, R> = fn(&C, Option<&str>) -> Result<R, TemplateError>;

/// An insertion-ordered map from directive name to factory.
///
/// One registry exists per subject type: events use the registry in
/// [`event`](super::event), stack trace elements the one in
/// [`frame`](super::frame).
pub(crate) struct ResolverRegistry<C, R> {
    factories: IndexMap<&'static str, Factory<C, R>>,
}

impl<C, R> ResolverRegistry<C, R> {
    pub(crate) fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Adds a factory; a later registration under the same name replaces it.
    pub(crate) fn register(mut self, name: &'static str, factory: Factory<C, R>) -> Self {
        self.factories.insert(name, factory);
        self
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub(crate) fn create(&self, context: &C, name: &str, key: Option<&str>) -> Result<R, TemplateError> {
        match self.factories.get(name) {
            Some(factory) => factory(context, key),
            None => Err(TemplateError::UnknownResolver {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(_: &(), key: Option<&str>) -> Result<String, TemplateError> {
        Ok(key.unwrap_or("none").to_string())
    }

    fn keyed(_: &(), key: Option<&str>) -> Result<String, TemplateError> {
        key.map(str::to_uppercase)
            .ok_or(TemplateError::MissingKey { resolver: "keyed" })
    }

    #[test]
    fn test_create_dispatches_by_name() {
        let registry = ResolverRegistry::new()
            .register("constant", constant as Factory<(), String>)
            .register("keyed", keyed);
        assert_eq!(registry.create(&(), "constant", None).unwrap(), "none");
        assert_eq!(registry.create(&(), "keyed", Some("abc")).unwrap(), "ABC");
        assert!(matches!(
            registry.create(&(), "keyed", None),
            Err(TemplateError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_unknown_name() {
        let registry: ResolverRegistry<(), String> = ResolverRegistry::new();
        let err = registry.create(&(), "nope", None).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownResolver { name } if name == "nope"));
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let registry = ResolverRegistry::new()
            .register("b", constant as Factory<(), String>)
            .register("a", constant);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
