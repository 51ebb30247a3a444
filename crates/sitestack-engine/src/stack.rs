//! Resource declarations.

use std::collections::{BTreeSet, HashMap};

use sitestack_core::SiteStackConfig;
use sitestack_model::{Output, ResourceArgs, ResourceProps, Urn, attrs};

use crate::error::{EngineError, EngineResult};

/// Options that apply to a declaration independently of its arguments.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    depends_on: Vec<Urn>,
}

impl ResourceOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Order this resource after `resource`, even if no property reads it.
    #[must_use]
    pub fn depends_on(mut self, resource: &ResourceRef) -> Self {
        self.depends_on.push(resource.urn.clone());
        self
    }
}

/// Handle to a declared resource, used to reference its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    urn: Urn,
}

impl ResourceRef {
    /// URN of the resource.
    #[must_use]
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// A published attribute, known once the resource is applied.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Output<String> {
        Output::attribute(self.urn.clone(), name)
    }

    /// Provider-assigned identifier.
    #[must_use]
    pub fn id(&self) -> Output<String> {
        self.attribute(attrs::ID)
    }

    /// Amazon Resource Name.
    #[must_use]
    pub fn arn(&self) -> Output<String> {
        self.attribute(attrs::ARN)
    }
}

/// One declared resource.
#[derive(Debug, Clone)]
pub struct ResourceDeclaration {
    urn: Urn,
    props: Output<ResourceProps>,
    depends_on: BTreeSet<Urn>,
}

impl ResourceDeclaration {
    /// URN of the resource.
    #[must_use]
    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    /// Deferred properties.
    #[must_use]
    pub fn props(&self) -> &Output<ResourceProps> {
        &self.props
    }

    /// Dependencies given through [`ResourceOptions::depends_on`].
    #[must_use]
    pub fn explicit_dependencies(&self) -> &BTreeSet<Urn> {
        &self.depends_on
    }

    /// Every dependency: explicit ones plus the resources the properties read.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<Urn> {
        self.depends_on
            .iter()
            .chain(self.props.dependencies())
            .cloned()
            .collect()
    }
}

/// A named collection of resource declarations and exported outputs.
#[derive(Debug, Clone)]
pub struct Stack {
    project: String,
    name: String,
    resources: Vec<ResourceDeclaration>,
    index: HashMap<Urn, usize>,
    exports: Vec<(String, Output<String>)>,
}

impl Stack {
    /// Create an empty stack.
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            resources: Vec::new(),
            index: HashMap::new(),
            exports: Vec::new(),
        }
    }

    /// Create an empty stack named after the configured project and stack.
    #[must_use]
    pub fn from_config(config: &SiteStackConfig) -> Self {
        Self::new(config.project.clone(), config.stack.clone())
    }

    /// Project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a resource.
    ///
    /// # Errors
    /// Returns [`EngineError::Model`] for an invalid logical, stack or project
    /// name and [`EngineError::DuplicateResource`] if the URN is already
    /// declared.
    pub fn register<A: ResourceArgs>(
        &mut self,
        name: &str,
        args: Output<A>,
        options: ResourceOptions,
    ) -> EngineResult<ResourceRef> {
        let urn = Urn::new(&self.name, &self.project, A::KIND, name)?;
        if self.index.contains_key(&urn) {
            return Err(EngineError::DuplicateResource(urn));
        }

        self.index.insert(urn.clone(), self.resources.len());
        self.resources.push(ResourceDeclaration {
            urn: urn.clone(),
            props: args.apply(A::into_props),
            depends_on: options.depends_on.into_iter().collect(),
        });
        Ok(ResourceRef { urn })
    }

    /// Export a named stack output.
    ///
    /// # Errors
    /// Returns [`EngineError::DuplicateOutput`] if the name is already exported.
    pub fn export(&mut self, name: impl Into<String>, value: Output<String>) -> EngineResult<()> {
        let name = name.into();
        if self.exports.iter().any(|(n, _)| *n == name) {
            return Err(EngineError::DuplicateOutput(name));
        }
        self.exports.push((name, value));
        Ok(())
    }

    /// Declarations in the order they were registered.
    #[must_use]
    pub fn resources(&self) -> &[ResourceDeclaration] {
        &self.resources
    }

    /// Look up a declaration.
    #[must_use]
    pub fn get(&self, urn: &Urn) -> Option<&ResourceDeclaration> {
        self.index.get(urn).map(|&i| &self.resources[i])
    }

    /// Whether a resource is declared.
    #[must_use]
    pub fn contains(&self, urn: &Urn) -> bool {
        self.index.contains_key(urn)
    }

    /// Exported outputs in the order they were exported.
    #[must_use]
    pub fn exports(&self) -> &[(String, Output<String>)] {
        &self.exports
    }
}

#[cfg(test)]
mod tests {
    use sitestack_model::{ModelError, ResourceKind};
    use sitestack_model::s3::{BucketArgs, PublicAccessBlockArgs};

    use super::*;

    #[test]
    fn test_should_register_and_build_urn() {
        let mut stack = Stack::new("static-website", "dev");
        let bucket = stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap();

        assert_eq!(bucket.urn().kind(), ResourceKind::Bucket);
        assert_eq!(
            bucket.urn().to_string(),
            "urn:sitestack:dev::static-website::aws:s3/bucketV2:BucketV2::site"
        );
        assert!(stack.contains(bucket.urn()));
    }

    #[test]
    fn test_should_reject_duplicate_declarations() {
        let mut stack = Stack::new("p", "s");
        stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap();
        let err = stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateResource(_)));
    }

    #[test]
    fn test_should_reject_project_that_breaks_urn_parsing() {
        let mut stack = Stack::new("my::site", "dev");
        let err = stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Model(ModelError::InvalidSegment { segment: "project", .. })
        ));
        assert!(stack.resources().is_empty());
    }

    #[test]
    fn test_should_allow_same_name_for_different_kinds() {
        let mut stack = Stack::new("p", "s");
        stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap();
        assert!(
            stack
                .register(
                    "site",
                    Output::known(PublicAccessBlockArgs::permissive("x")),
                    ResourceOptions::new(),
                )
                .is_ok()
        );
    }

    #[test]
    fn test_should_collect_explicit_and_implicit_dependencies() {
        let mut stack = Stack::new("p", "s");
        let bucket = stack
            .register("site", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap();
        let other = stack
            .register("other", Output::known(BucketArgs::default()), ResourceOptions::new())
            .unwrap();
        let pab = stack
            .register(
                "pab",
                bucket.id().apply(|b| PublicAccessBlockArgs::permissive(b)),
                ResourceOptions::new().depends_on(&other),
            )
            .unwrap();

        let decl = stack.get(pab.urn()).unwrap();
        assert_eq!(
            decl.dependencies(),
            BTreeSet::from([bucket.urn().clone(), other.urn().clone()])
        );
        assert_eq!(
            decl.explicit_dependencies(),
            &BTreeSet::from([other.urn().clone()])
        );
    }

    #[test]
    fn test_should_reject_duplicate_exports() {
        let mut stack = Stack::new("p", "s");
        stack.export("bucketName", Output::known("a".to_owned())).unwrap();
        assert!(matches!(
            stack.export("bucketName", Output::known("b".to_owned())),
            Err(EngineError::DuplicateOutput(_))
        ));
        assert_eq!(stack.exports().len(), 1);
    }
}
