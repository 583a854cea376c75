//! Argument evaluation and provider invocation.

use crate::argument::Argument;
use crate::callable::{Failure, Provider};
use crate::definition::{Definition, ProviderSlot};
use crate::error::{DiError, DiResult};
use crate::reference::Reference;
use crate::value::Value;

use super::Container;

const SINGLE_RETURN: usize = 1;
const DOUBLE_RETURN: usize = 2;

/// Builds one definition against a container.
pub(super) struct Engine<'c> {
    container: &'c Container,
}

impl<'c> Engine<'c> {
    pub(super) fn new(container: &'c Container) -> Self {
        Engine { container }
    }

    pub(super) fn instantiate(&self, definition: &Definition) -> DiResult<Value> {
        let reference = definition.reference();
        let slot = definition
            .provider_slot()
            .ok_or_else(|| DiError::ProviderMissing(reference.clone()))?;

        let args = self.evaluate_all(reference, definition.spec().arguments(), 0)?;

        let provider = match slot {
            ProviderSlot::Callable(provider) => provider.clone(),
            ProviderSlot::Value(value) => {
                value
                    .get::<Provider>()
                    .ok_or_else(|| DiError::ProviderNotAFunction {
                        reference: reference.clone(),
                        actual: value.type_name(),
                    })?
            }
        };

        self.call(reference, &provider, &args)
    }

    /// Evaluates `args` in order, stopping at the first failure.
    ///
    /// Positions reported in errors and middleware events start at `first`,
    /// so they index the callable's parameter list.
    pub(super) fn evaluate_all(
        &self,
        owner: &Reference,
        args: &[Argument],
        first: usize,
    ) -> DiResult<Vec<Value>> {
        let logger = self.container.logger();
        logger.debug("parsing arguments for provider", &[("service", owner)]);

        let values = args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                let position = first + index;
                let value = self.evaluate(arg).map_err(|source| DiError::Argument {
                    reference: owner.clone(),
                    position,
                    source: Box::new(source),
                })?;
                self.container
                    .filter_argument(owner, position, arg.kind(), value)
            })
            .collect::<DiResult<Vec<_>>>()?;

        logger.debug(
            "arguments for provider parsed successfully",
            &[("service", owner), ("count", &values.len())],
        );
        Ok(values)
    }

    fn evaluate(&self, arg: &Argument) -> DiResult<Value> {
        let container = self.container;
        Ok(match arg {
            Argument::Literal(value) => value.clone(),
            Argument::Service(reference) => container.get(reference)?,
            Argument::Tagged(tags) => Value::new(container.find_by_tags(tags)?),
            Argument::Param(path) => {
                container
                    .parameter_provider()
                    .get(path)
                    .map_err(|source| DiError::Parameter {
                        path: path.clone(),
                        source,
                    })?
            }
            Argument::Context => Value::new(container.context().clone()),
            Argument::Container => Value::new(container.clone()),
            Argument::ParameterProvider => Value::new(container.parameter_provider()),
            Argument::Logger => Value::new(container.logger()),
            Argument::MethodCall {
                service,
                method,
                args,
            } => self.call_method(service, method, args)?,
        })
    }

    fn call_method(&self, service: &Reference, method: &str, args: &[Argument]) -> DiResult<Value> {
        let receiver = self.container.get(service)?;
        let definition = self
            .container
            .registry()
            .load(service)
            .ok_or_else(|| DiError::ServiceNotFound(service.clone()))?;
        let callable = definition
            .method(method)
            .cloned()
            .ok_or_else(|| DiError::MethodNotFound {
                reference: service.clone(),
                method: method.to_string(),
            })?;

        // The receiver occupies position 0
        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(receiver);
        values.extend(self.evaluate_all(service, args, 1)?);
        self.call(service, &callable, &values)
    }

    /// Validates `args` against the declared parameters, invokes and
    /// normalizes the return list.
    pub(super) fn call(&self, reference: &Reference, provider: &Provider, args: &[Value]) -> DiResult<Value> {
        let params = provider.params();
        if params.len() != args.len() {
            return Err(DiError::ArgCountMismatch {
                reference: reference.clone(),
                expected: params.len(),
                actual: args.len(),
            });
        }

        if let Some((position, (param, value))) = params
            .iter()
            .zip(args)
            .enumerate()
            .find(|(_, (param, value))| !param.accepts(value))
        {
            return Err(DiError::ArgTypeMismatch {
                reference: reference.clone(),
                position,
                expected: param.type_name,
                actual: value.type_name(),
            });
        }

        let returns = provider
            .call(args)
            .map_err(|mismatch| DiError::ArgTypeMismatch {
                reference: reference.clone(),
                position: mismatch.position,
                expected: mismatch.expected,
                actual: mismatch.actual,
            })?;

        normalize(reference, returns)
    }
}

/// `[value]` and `[value, nil]` succeed; `[_, Failure]` fails.
///
/// A second value that is neither nil nor a [`Failure`] does not signal an
/// error.
fn normalize(reference: &Reference, mut returns: Vec<Value>) -> DiResult<Value> {
    match returns.len() {
        SINGLE_RETURN => Ok(returns.remove(0)),
        DOUBLE_RETURN => match returns[1].get::<Failure>() {
            Some(Failure(source)) => Err(DiError::ProviderFailed {
                reference: reference.clone(),
                source,
            }),
            None => Ok(returns.remove(0)),
        },
        count => Err(DiError::TooManyReturnValues {
            reference: reference.clone(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callable::ParamSpec;
    use crate::error::ErrorKind;

    fn reference() -> Reference {
        Reference::from("svc")
    }

    #[test]
    fn single_and_nil_paired_returns_succeed() {
        let one = normalize(&reference(), vec![Value::new(1u8)]).unwrap();
        assert_eq!(one.get::<u8>(), Some(1));

        let pair = normalize(&reference(), vec![Value::new(2u8), Value::nil()]).unwrap();
        assert_eq!(pair.get::<u8>(), Some(2));
    }

    #[test]
    fn failure_in_error_slot_fails() {
        let err = normalize(
            &reference(),
            vec![Value::nil(), Value::new(Failure::new("boom"))],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderFailed);
        assert_eq!(err.to_string(), "provider of svc failed: boom");
    }

    #[test]
    fn other_counts_are_rejected() {
        for count in [0usize, 3] {
            let err = normalize(&reference(), vec![Value::nil(); count]).unwrap_err();
            assert!(matches!(err, DiError::TooManyReturnValues { count: c, .. } if c == count));
        }
    }

    #[test]
    fn call_checks_count_then_types() {
        let container = Container::new();
        let engine = Engine::new(&container);
        let provider = Provider::new(|s: String, b: bool| format!("{s}{b}"));

        let err = engine
            .call(&reference(), &provider, &[Value::new("x".to_string())])
            .unwrap_err();
        assert!(matches!(err, DiError::ArgCountMismatch { expected: 2, actual: 1, .. }));

        let err = engine
            .call(&reference(), &provider, &[Value::new(1i64), Value::new(true)])
            .unwrap_err();
        assert!(matches!(err, DiError::ArgTypeMismatch { position: 0, actual: "i64", .. }));

        let ok = engine
            .call(&reference(), &provider, &[Value::new("x".to_string()), Value::new(true)])
            .unwrap();
        assert_eq!(ok.get::<String>().as_deref(), Some("xtrue"));
    }

    #[test]
    fn dynamic_provider_declares_its_own_params() {
        let container = Container::new();
        let engine = Engine::new(&container);
        let provider = Provider::dynamic(vec![ParamSpec::of::<u32>()], |args| {
            vec![args[0].clone(), Value::nil(), Value::nil()]
        });

        let err = engine
            .call(&reference(), &provider, &[Value::new(1u32)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyReturnValues);
    }
}
