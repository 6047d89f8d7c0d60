//! Typed CloudFormation template model.
//!
//! The builder assembles templates out of these types instead of untyped
//! JSON maps; one serializer at the bottom renders the CloudFormation JSON
//! shape. All sections are `BTreeMap`s so rendering is deterministic.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// CloudFormation template format version emitted on every template.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// An intrinsic-function expression or literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal string.
    Str(String),
    /// Literal integer.
    Int(i64),
    /// JSON array of expressions.
    List(Vec<Expr>),
    /// `{"Ref": name}`
    Ref(String),
    /// `{"Fn::Join": [delimiter, parts]}`
    Join(String, Vec<Expr>),
    /// `{"Fn::Split": [delimiter, source]}`
    Split(String, Box<Expr>),
    /// `{"Fn::If": [condition, then, otherwise]}`
    If(String, Box<Expr>, Box<Expr>),
    /// `{"Fn::Equals": [left, right]}`
    Equals(Box<Expr>, Box<Expr>),
    /// `{"Fn::Not": [inner]}`
    Not(Box<Expr>),
    /// `{"Fn::Select": [index, from]}`
    Select(u32, Box<Expr>),
}

impl Expr {
    pub fn str(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Expr::Ref(name.into())
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<Expr>) -> Self {
        Expr::Join(delimiter.into(), parts)
    }

    pub fn split(delimiter: impl Into<String>, source: Expr) -> Self {
        Expr::Split(delimiter.into(), Box::new(source))
    }

    pub fn if_(condition: impl Into<String>, then: Expr, otherwise: Expr) -> Self {
        Expr::If(condition.into(), Box::new(then), Box::new(otherwise))
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Expr::Equals(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn select(index: u32, from: Expr) -> Self {
        Expr::Select(index, Box::new(from))
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        fn entry<S: Serializer, V: Serialize>(
            serializer: S,
            key: &str,
            value: &V,
        ) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(key, value)?;
            map.end()
        }

        match self {
            Expr::Str(value) => serializer.serialize_str(value),
            Expr::Int(value) => serializer.serialize_i64(*value),
            Expr::List(items) => items.serialize(serializer),
            Expr::Ref(name) => entry(serializer, "Ref", name),
            Expr::Join(delimiter, parts) => entry(
                serializer,
                "Fn::Join",
                &(delimiter, parts),
            ),
            Expr::Split(delimiter, source) => entry(
                serializer,
                "Fn::Split",
                &(delimiter, source),
            ),
            Expr::If(condition, then, otherwise) => entry(
                serializer,
                "Fn::If",
                &(condition, then, otherwise),
            ),
            Expr::Equals(left, right) => entry(serializer, "Fn::Equals", &(left, right)),
            Expr::Not(inner) => entry(serializer, "Fn::Not", &(inner,)),
            Expr::Select(index, from) => entry(serializer, "Fn::Select", &(index, from)),
        }
    }
}

/// A template parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterSpec {
    #[serde(rename = "Type")]
    pub parameter_type: ParameterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ParameterSpec {
    /// Plain `String` parameter with no default.
    pub fn string() -> Self {
        ParameterSpec {
            parameter_type: ParameterType::String,
            default: None,
        }
    }

    /// `String` parameter with a default value.
    pub fn string_with_default(default: impl Into<String>) -> Self {
        ParameterSpec {
            parameter_type: ParameterType::String,
            default: Some(default.into()),
        }
    }

    /// `CommaDelimitedList` parameter.
    pub fn comma_delimited_list() -> Self {
        ParameterSpec {
            parameter_type: ParameterType::CommaDelimitedList,
            default: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterType {
    String,
    CommaDelimitedList,
}

/// CORS rule attached to the bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsRule {
    pub allowed_headers: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub id: String,
    pub max_age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CorsConfiguration {
    pub cors_rules: Vec<CorsRule>,
}

/// One bucket-event-to-Lambda wiring entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaConfiguration {
    pub event: String,
    pub function: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationConfiguration {
    pub lambda_configurations: Vec<LambdaConfiguration>,
}

/// `AWS::S3::Bucket` properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketProperties {
    pub bucket_name: Expr,
    pub cors_configuration: CorsConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_configuration: Option<NotificationConfiguration>,
}

/// IAM condition block on a policy statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IamCondition {
    #[serde(rename = "StringLike")]
    StringLike(BTreeMap<String, Expr>),
}

/// One IAM policy statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: String,
    pub action: Expr,
    pub resource: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<IamCondition>,
}

impl Statement {
    /// An `Allow` statement with no condition.
    pub fn allow(action: Expr, resource: Expr) -> Self {
        Statement {
            effect: "Allow".to_string(),
            action,
            resource,
            condition: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        PolicyDocument {
            version: "2012-10-17".to_string(),
            statement,
        }
    }
}

/// `AWS::IAM::Policy` properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_name: Expr,
    pub roles: Vec<Expr>,
    pub policy_document: PolicyDocument,
}

/// `AWS::Lambda::Permission` properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LambdaPermissionProperties {
    pub action: String,
    pub function_name: Expr,
    pub principal: String,
    pub source_account: Expr,
    pub source_arn: Expr,
}

/// Typed payload of a template resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceProperties {
    Bucket(BucketProperties),
    Policy(PolicyProperties),
    LambdaPermission(LambdaPermissionProperties),
}

/// One entry in the `Resources` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub properties: ResourceProperties,
}

impl Resource {
    pub fn bucket(properties: BucketProperties) -> Self {
        Resource {
            resource_type: "AWS::S3::Bucket".to_string(),
            condition: None,
            depends_on: Vec::new(),
            properties: ResourceProperties::Bucket(properties),
        }
    }

    pub fn policy(condition: Option<String>, properties: PolicyProperties) -> Self {
        Resource {
            resource_type: "AWS::IAM::Policy".to_string(),
            condition,
            depends_on: Vec::new(),
            properties: ResourceProperties::Policy(properties),
        }
    }

    pub fn lambda_permission(properties: LambdaPermissionProperties) -> Self {
        Resource {
            resource_type: "AWS::Lambda::Permission".to_string(),
            condition: None,
            depends_on: Vec::new(),
            properties: ResourceProperties::LambdaPermission(properties),
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }
}

/// One entry in the `Outputs` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Expr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A full CloudFormation template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(rename = "Conditions", skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, Expr>,
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Template {
            format_version: FORMAT_VERSION.to_string(),
            description: description.into(),
            parameters: BTreeMap::new(),
            conditions: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, spec: ParameterSpec) {
        self.parameters.insert(name.into(), spec);
    }

    pub fn add_condition(&mut self, name: impl Into<String>, expr: Expr) {
        self.conditions.insert(name.into(), expr);
    }

    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Resource) {
        self.resources.insert(logical_id.into(), resource);
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) {
        self.outputs.insert(name.into(), output);
    }

    /// Render the template as pretty-printed CloudFormation JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}
