//! Template builder.
//!
//! Turns a normalized answer record into the full CloudFormation template
//! for the storage resource. Every reference to another category's exports
//! is recorded as a dependency edge, so the `dependsOn` metadata can never
//! drift from what the template actually uses.

use std::collections::BTreeMap;

use stratus_core::inputs::StorageUserInputs;
use stratus_core::permission::{self, ProviderAction};
use stratus_core::template::{
    BucketProperties, CorsConfiguration, CorsRule, Expr, IamCondition, LambdaConfiguration,
    LambdaPermissionProperties, NotificationConfiguration, Output, ParameterSpec, PolicyDocument,
    PolicyProperties, Resource, Statement, Template,
};
use stratus_core::{DependencyCollector, DependencyEdge, Error, Result};

use crate::params::{names, DISALLOW, NONE_SENTINEL};
use crate::resolve::DependencyResolver;

const BUCKET_LOGICAL_ID: &str = "S3Bucket";
const TRIGGER_PERMISSIONS_ID: &str = "TriggerPermissions";
const TRIGGER_POLICY_ID: &str = "S3TriggerBucketPolicy";
const TEMPLATE_DESCRIPTION: &str = "S3 resource stack created by Stratus";

const OBJECT_CREATED_EVENT: &str = "s3:ObjectCreated:*";
const OBJECT_REMOVED_EVENT: &str = "s3:ObjectRemoved:*";

/// Template plus the dependency edges it references.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub template: Template,
    pub depends_on: Vec<DependencyEdge>,
}

/// Builds the storage template from a normalized answer record.
pub struct TemplateBuilder<'a> {
    inputs: &'a StorageUserInputs,
    resolver: &'a dyn DependencyResolver,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(inputs: &'a StorageUserInputs, resolver: &'a dyn DependencyResolver) -> Self {
        TemplateBuilder { inputs, resolver }
    }

    pub fn build(&self) -> Result<BuildOutput> {
        self.inputs.validate()?;

        let mut template = Template::new(TEMPLATE_DESCRIPTION);
        let mut collector = DependencyCollector::new();

        self.add_parameters(&mut template);
        self.add_conditions(&mut template);
        self.add_bucket(&mut template, &mut collector)?;
        self.add_access_policies(&mut template);
        self.add_group_policies(&mut template, &mut collector)?;
        self.add_outputs(&mut template);

        Ok(BuildOutput {
            template,
            depends_on: collector.into_edges(),
        })
    }

    fn add_parameters(&self, template: &mut Template) {
        for name in [
            names::ENV,
            names::BUCKET_NAME,
            names::AUTH_ROLE_NAME,
            names::UNAUTH_ROLE_NAME,
        ] {
            template.add_parameter(name, ParameterSpec::string());
        }
        for name in [
            names::PUBLIC_POLICY,
            names::PRIVATE_POLICY,
            names::PROTECTED_POLICY,
            names::UPLOADS_POLICY,
            names::READ_POLICY,
            names::AUTH_POLICY_NAME,
            names::UNAUTH_POLICY_NAME,
            names::TRIGGER_FUNCTION,
        ] {
            template.add_parameter(name, ParameterSpec::string_with_default(NONE_SENTINEL));
        }
        for name in [
            names::AUTH_PUBLIC,
            names::AUTH_PROTECTED,
            names::AUTH_PRIVATE,
            names::AUTH_UPLOADS,
            names::GUEST_PUBLIC,
            names::GUEST_UPLOADS,
            names::AUTH_ALLOW_LIST,
            names::GUEST_ALLOW_LIST,
        ] {
            template.add_parameter(name, ParameterSpec::string_with_default(DISALLOW));
        }
        for name in [
            names::SELECTED_AUTH_PERMISSIONS,
            names::SELECTED_GUEST_PERMISSIONS,
        ] {
            template.add_parameter(name, ParameterSpec::comma_delimited_list());
        }
    }

    fn add_conditions(&self, template: &mut Template) {
        template.add_condition(
            "ShouldNotCreateEnvResources",
            Expr::equals(Expr::reference(names::ENV), Expr::str(NONE_SENTINEL)),
        );
        for (condition, parameter) in [
            ("CreateAuthPublic", names::AUTH_PUBLIC),
            ("CreateAuthProtected", names::AUTH_PROTECTED),
            ("CreateAuthPrivate", names::AUTH_PRIVATE),
            ("CreateAuthUploads", names::AUTH_UPLOADS),
            ("CreateGuestPublic", names::GUEST_PUBLIC),
            ("CreateGuestUploads", names::GUEST_UPLOADS),
            ("AuthReadAndList", names::AUTH_ALLOW_LIST),
            ("GuestReadAndList", names::GUEST_ALLOW_LIST),
        ] {
            template.add_condition(
                condition,
                Expr::not(Expr::equals(
                    Expr::reference(parameter),
                    Expr::str(DISALLOW),
                )),
            );
        }
    }

    /// Physical bucket name: as given when no environment is bound,
    /// otherwise suffixed with the environment name.
    fn bucket_name_expr(&self) -> Expr {
        Expr::if_(
            "ShouldNotCreateEnvResources",
            Expr::reference(names::BUCKET_NAME),
            Expr::join(
                "",
                vec![
                    Expr::reference(names::BUCKET_NAME),
                    Expr::str("-"),
                    Expr::reference(names::ENV),
                ],
            ),
        )
    }

    fn bucket_arn(&self) -> Expr {
        Expr::join(
            "",
            vec![Expr::str("arn:aws:s3:::"), Expr::reference(BUCKET_LOGICAL_ID)],
        )
    }

    fn path_arn(&self, path: &str) -> Expr {
        Expr::join(
            "",
            vec![
                Expr::str("arn:aws:s3:::"),
                Expr::reference(BUCKET_LOGICAL_ID),
                Expr::str(path),
            ],
        )
    }

    fn add_bucket(
        &self,
        template: &mut Template,
        collector: &mut DependencyCollector,
    ) -> Result<()> {
        let notification_configuration = match self.inputs.trigger_function.name() {
            None => None,
            Some(function) => {
                if !self.resolver.functions().iter().any(|f| f == function) {
                    return Err(Error::dependency(format!(
                        "trigger function '{function}' does not exist in this project"
                    )));
                }
                self.add_trigger_resources(template, collector, function);
                let arn_param = format!("function{function}Arn");
                Some(NotificationConfiguration {
                    lambda_configurations: vec![
                        LambdaConfiguration {
                            event: OBJECT_CREATED_EVENT.to_string(),
                            function: Expr::reference(&arn_param),
                        },
                        LambdaConfiguration {
                            event: OBJECT_REMOVED_EVENT.to_string(),
                            function: Expr::reference(&arn_param),
                        },
                    ],
                })
            }
        };

        let mut bucket = Resource::bucket(BucketProperties {
            bucket_name: self.bucket_name_expr(),
            cors_configuration: default_cors(),
            notification_configuration,
        });
        if self.inputs.trigger_function.name().is_some() {
            bucket = bucket.depends_on(TRIGGER_PERMISSIONS_ID);
        }
        template.add_resource(BUCKET_LOGICAL_ID, bucket);
        Ok(())
    }

    fn add_trigger_resources(
        &self,
        template: &mut Template,
        collector: &mut DependencyCollector,
        function: &str,
    ) {
        let arn_param = format!("function{function}Arn");
        let role_param = format!("function{function}LambdaExecutionRole");

        template.add_parameter(&arn_param, ParameterSpec::string());
        template.add_parameter(&role_param, ParameterSpec::string());
        collector.record("function", function, "Arn");
        collector.record("function", function, "LambdaExecutionRole");

        template.add_resource(
            TRIGGER_PERMISSIONS_ID,
            Resource::lambda_permission(LambdaPermissionProperties {
                action: "lambda:InvokeFunction".to_string(),
                function_name: Expr::reference(&arn_param),
                principal: "s3.amazonaws.com".to_string(),
                source_account: Expr::reference("AWS::AccountId"),
                source_arn: Expr::join(
                    "",
                    vec![Expr::str("arn:aws:s3:::"), self.bucket_name_expr()],
                ),
            }),
        );

        // Execution-role policy letting the trigger work with bucket contents.
        template.add_resource(
            TRIGGER_POLICY_ID,
            Resource::policy(
                None,
                PolicyProperties {
                    policy_name: Expr::str("stratus-lambda-execution-policy"),
                    roles: vec![Expr::reference(&role_param)],
                    policy_document: PolicyDocument::new(vec![Statement::allow(
                        Expr::List(vec![
                            Expr::str(ProviderAction::PutObject.as_str()),
                            Expr::str(ProviderAction::GetObject.as_str()),
                            Expr::str(ProviderAction::ListBucket.as_str()),
                            Expr::str(ProviderAction::DeleteObject.as_str()),
                        ]),
                        Expr::List(vec![self.path_arn("/*"), self.bucket_arn()]),
                    )]),
                },
            ),
        );
    }

    /// The eight conditional auth/guest policies. All are always emitted;
    /// the `DISALLOW`-keyed conditions decide which ones materialize.
    fn add_access_policies(&self, template: &mut Template) {
        let auth_role = Expr::reference(names::AUTH_ROLE_NAME);
        let unauth_role = Expr::reference(names::UNAUTH_ROLE_NAME);

        let path_policies: [(&str, &str, &str, &str, &Expr, &str); 6] = [
            (
                "S3AuthPublicPolicy",
                "CreateAuthPublic",
                names::PUBLIC_POLICY,
                names::AUTH_PUBLIC,
                &auth_role,
                "/public/*",
            ),
            (
                "S3AuthProtectedPolicy",
                "CreateAuthProtected",
                names::PROTECTED_POLICY,
                names::AUTH_PROTECTED,
                &auth_role,
                "/protected/${cognito-identity.amazonaws.com:sub}/*",
            ),
            (
                "S3AuthPrivatePolicy",
                "CreateAuthPrivate",
                names::PRIVATE_POLICY,
                names::AUTH_PRIVATE,
                &auth_role,
                "/private/${cognito-identity.amazonaws.com:sub}/*",
            ),
            (
                "S3AuthUploadPolicy",
                "CreateAuthUploads",
                names::UPLOADS_POLICY,
                names::AUTH_UPLOADS,
                &auth_role,
                "/uploads/*",
            ),
            (
                "S3GuestPublicPolicy",
                "CreateGuestPublic",
                names::PUBLIC_POLICY,
                names::GUEST_PUBLIC,
                &unauth_role,
                "/public/*",
            ),
            (
                "S3GuestUploadPolicy",
                "CreateGuestUploads",
                names::UPLOADS_POLICY,
                names::GUEST_UPLOADS,
                &unauth_role,
                "/uploads/*",
            ),
        ];

        for (logical_id, condition, name_param, permission_param, role, path) in path_policies {
            template.add_resource(
                logical_id,
                Resource::policy(
                    Some(condition.to_string()),
                    PolicyProperties {
                        policy_name: Expr::reference(name_param),
                        roles: vec![role.clone()],
                        policy_document: PolicyDocument::new(vec![Statement::allow(
                            Expr::split(",", Expr::reference(permission_param)),
                            Expr::List(vec![self.path_arn(path)]),
                        )]),
                    },
                ),
            );
        }

        template.add_resource(
            "S3AuthReadPolicy",
            Resource::policy(
                Some("AuthReadAndList".to_string()),
                self.read_policy(
                    auth_role.clone(),
                    &[
                        "public/",
                        "public/*",
                        "protected/",
                        "protected/*",
                        "private/${cognito-identity.amazonaws.com:sub}/",
                        "private/${cognito-identity.amazonaws.com:sub}/*",
                    ],
                ),
            )
            .depends_on(BUCKET_LOGICAL_ID),
        );
        template.add_resource(
            "S3GuestReadPolicy",
            Resource::policy(
                Some("GuestReadAndList".to_string()),
                self.read_policy(
                    unauth_role,
                    &["public/", "public/*", "protected/", "protected/*"],
                ),
            )
            .depends_on(BUCKET_LOGICAL_ID),
        );
    }

    /// Read policy: object reads under `/protected/*`, plus a prefix-scoped
    /// `ListBucket` on the bucket itself.
    fn read_policy(&self, role: Expr, prefixes: &[&str]) -> PolicyProperties {
        let mut condition_keys = BTreeMap::new();
        condition_keys.insert(
            "s3:prefix".to_string(),
            Expr::List(prefixes.iter().map(|p| Expr::str(*p)).collect()),
        );

        PolicyProperties {
            policy_name: Expr::reference(names::READ_POLICY),
            roles: vec![role],
            policy_document: PolicyDocument::new(vec![
                Statement::allow(
                    Expr::List(vec![Expr::str(ProviderAction::GetObject.as_str())]),
                    Expr::List(vec![self.path_arn("/protected/*")]),
                ),
                Statement {
                    effect: "Allow".to_string(),
                    action: Expr::List(vec![Expr::str(ProviderAction::ListBucket.as_str())]),
                    resource: Expr::List(vec![self.bucket_arn()]),
                    condition: Some(IamCondition::StringLike(condition_keys)),
                },
            ]),
        }
    }

    fn add_group_policies(
        &self,
        template: &mut Template,
        collector: &mut DependencyCollector,
    ) -> Result<()> {
        if !self.inputs.has_groups() {
            return Ok(());
        }
        let auth_resource = self.resolver.auth_resource().ok_or_else(|| {
            Error::dependency(
                "group access requires an auth resource, but none is configured",
            )
        })?;
        let pool_param = format!("auth{auth_resource}UserPoolId");
        template.add_parameter(&pool_param, ParameterSpec::string());
        collector.record("auth", &auth_resource, "UserPoolId");

        for group in &self.inputs.group_list {
            let permissions = self
                .inputs
                .group_permissions
                .get(group)
                .ok_or_else(|| {
                    Error::validation(format!("group '{group}' has no permission set"))
                })?;

            let group_role = Expr::join(
                "-",
                vec![
                    Expr::reference(&pool_param),
                    Expr::str(format!("{group}GroupRole")),
                ],
            );

            let object_actions: Vec<Expr> = permission::provider_actions(permissions)
                .into_iter()
                .filter(|a| *a != ProviderAction::ListBucket)
                .map(|a| Expr::str(a.as_str()))
                .collect();

            let mut statements = Vec::new();
            if !object_actions.is_empty() {
                statements.push(Statement::allow(
                    Expr::List(object_actions),
                    Expr::List(vec![self.path_arn("/*")]),
                ));
            }
            if permissions.contains(&stratus_core::Permission::List) {
                statements.push(Statement::allow(
                    Expr::List(vec![Expr::str(ProviderAction::ListBucket.as_str())]),
                    Expr::List(vec![self.bucket_arn()]),
                ));
            }

            template.add_resource(
                format!("{group}GroupPolicy"),
                Resource::policy(
                    None,
                    PolicyProperties {
                        policy_name: Expr::str(format!("{group}-group-s3-policy")),
                        roles: vec![group_role],
                        policy_document: PolicyDocument::new(statements),
                    },
                ),
            );
        }
        Ok(())
    }

    fn add_outputs(&self, template: &mut Template) {
        template.add_output(
            "BucketName",
            Output {
                value: Expr::reference(BUCKET_LOGICAL_ID),
                description: Some("Bucket name for the S3 bucket".to_string()),
            },
        );
        template.add_output(
            "Region",
            Output {
                value: Expr::reference("AWS::Region"),
                description: None,
            },
        );
    }
}

fn default_cors() -> CorsConfiguration {
    CorsConfiguration {
        cors_rules: vec![CorsRule {
            allowed_headers: vec!["*".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "HEAD".to_string(),
                "PUT".to_string(),
                "POST".to_string(),
                "DELETE".to_string(),
            ],
            allowed_origins: vec!["*".to_string()],
            exposed_headers: vec![
                "x-amz-server-side-encryption".to_string(),
                "x-amz-request-id".to_string(),
                "x-amz-id-2".to_string(),
                "ETag".to_string(),
            ],
            id: "S3CORSRuleId1".to_string(),
            max_age: 3000,
        }],
    }
}
