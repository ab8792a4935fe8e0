//! Shared fixtures for the micro-http and micro-web benchmarks.

use http::Method;
use micro_http::protocol::header::{HttpChallenge, HttpHeader};
use micro_web::rejection::{
    AuthenticationFailedCause, AuthenticationFailedRejection, MethodRejection, MissingHeaderRejection,
    MissingQueryParamRejection, Rejection, RejectionKind,
};

#[derive(Debug, Clone)]
pub struct TestCase<T> {
    name: &'static str,
    group: TestGroup,
    fixture: fn(TestGroup) -> T,
}

impl<T> TestCase<T> {
    pub fn new(name: &'static str, group: TestGroup, fixture: fn(TestGroup) -> T) -> Self {
        Self { name, group, fixture }
    }

    pub fn small(name: &'static str, fixture: fn(TestGroup) -> T) -> Self {
        Self::new(name, TestGroup::Small, fixture)
    }

    pub fn normal(name: &'static str, fixture: fn(TestGroup) -> T) -> Self {
        Self::new(name, TestGroup::Normal, fixture)
    }

    pub fn large(name: &'static str, fixture: fn(TestGroup) -> T) -> Self {
        Self::new(name, TestGroup::Large, fixture)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    /// Builds a fresh input sized for this case's group.
    pub fn input(&self) -> T {
        (self.fixture)(self.group)
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}

impl TestGroup {
    /// How many items a fixture of this group holds.
    pub fn size(self) -> usize {
        match self {
            TestGroup::Small => 2,
            TestGroup::Normal => 16,
            TestGroup::Large => 128,
        }
    }
}

/// A rejection set the way a router with many alternatives collects it:
/// repeated method rejections, a few missing parameters and challenges.
pub fn mixed_rejections(group: TestGroup) -> Vec<Rejection> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

    (0..group.size())
        .map(|i| match i % 4 {
            0 => MethodRejection::new(methods[i / 4 % methods.len()].clone()).into(),
            1 => MissingQueryParamRejection::new(format!("param{i}")).into(),
            2 => MissingHeaderRejection::new(format!("x-header-{i}")).into(),
            _ => AuthenticationFailedRejection::new(
                AuthenticationFailedCause::CredentialsMissing,
                HttpChallenge::basic(format!("realm{i}")),
            )
            .into(),
        })
        .collect()
}

/// [`mixed_rejections`] with a cancellation of all method rejections appended.
pub fn cancelled_rejections(group: TestGroup) -> Vec<Rejection> {
    let mut rejections = mixed_rejections(group);
    rejections.extend(rejections.clone());
    rejections.push(Rejection::cancel([RejectionKind::Method]));
    rejections
}

/// Raw headers named like typical browser request headers.
pub fn request_headers(group: TestGroup) -> Vec<HttpHeader> {
    (0..group.size())
        .filter_map(|i| HttpHeader::raw(format!("x-request-header-{i}"), format!("value-{i}")).ok())
        .collect()
}
