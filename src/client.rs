//! The client: named operations composed over one transport.
//!
//! A [`Client`] maps call names to [`ClientSpec`]s and composes, per
//! call, the fixed chain `retry(handle(send(build)))` followed by
//! `receive`. The nesting order is load-bearing: building happens inside
//! the send attempt so build failures flow through error handling, and
//! classification happens inside each retry attempt so a transient error
//! is classified fresh every time.
//!
//! Use [`ClientBuilder`] to register operations and create clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::schema::{to_fields, FieldMap};
use crate::spec::ClientSpec;
use crate::transport::Transport;
use crate::{Error, Result};

/// A client for one remote service.
///
/// The client is immutable after construction and cheap to clone; clones
/// share the transport and the registered operations. Calls on separate
/// threads need no synchronization.
///
/// # Examples
///
/// ```no_run
/// use apiweave::{
///     ApiSpec, Client, ClientSpec, HttpTransport, MetaSchema, ObjectSchema,
///     RequestSpec, to_fields, PATH_SEGMENT, BODY_SEGMENT,
/// };
/// use serde_json::json;
///
/// # fn example() -> Result<(), apiweave::Error> {
/// let input = MetaSchema::builder()
///     .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
///     .build()?;
/// let output = MetaSchema::builder()
///     .segment(BODY_SEGMENT, ObjectSchema::new().required("id").optional("title"))
///     .build()?;
///
/// let client = Client::builder(HttpTransport::new("http://localhost:8080")?)
///     .operation(
///         "get_volume",
///         ClientSpec::new(
///             ApiSpec::get("volumes/{id}", input, output),
///             RequestSpec::http_default(),
///         ),
///     )
///     .build()?;
///
/// let volume = client.call("get_volume", to_fields(json!({ "id": "v-1" }))?)?;
/// println!("title: {:?}", volume.get("title"));
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T: Transport> {
    transport: T,
    operations: BTreeMap<String, ClientSpec<T::Raw>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> Client<T> {
    /// Starts a builder over the given transport.
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder::new(transport)
    }

    /// Looks up the spec registered under `name`.
    ///
    /// Fails with [`Error::MethodNotFound`] carrying the name; an
    /// unregistered operation is an error of its own kind, never confused
    /// with a failed call.
    pub fn resolve(&self, name: &str) -> Result<&ClientSpec<T::Raw>> {
        self.inner.operations.get(name).ok_or_else(|| Error::MethodNotFound {
            name: name.to_string(),
        })
    }

    /// The registered operation names, in sorted order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.inner.operations.keys().map(String::as_str)
    }

    /// Invokes the operation registered under `name` with the given
    /// fields.
    ///
    /// Returns whatever the transport's `receive` yields: deserialized
    /// fields for a blocking transport, a [`Deferred`](crate::Deferred)
    /// of them for a deferred one.
    pub fn call(&self, name: &str, fields: FieldMap) -> Result<T::Output> {
        let spec = self.resolve(name)?;
        tracing::debug!(method = name, path = spec.api_spec().name(), "dispatching call");

        let result = self.run(spec, &fields);
        if let Err(error) = &result {
            tracing::error!(method = name, error = %error, "call failed");
        }
        result
    }

    fn run(&self, spec: &ClientSpec<T::Raw>, fields: &FieldMap) -> Result<T::Output> {
        let transport = &self.inner.transport;
        let api_spec = spec.api_spec();

        let mut send_once = || {
            let request = transport.build(api_spec, fields)?;
            transport.send(request)
        };
        let error_strategy = spec.request_spec().error_strategy();
        let mut attempt = || error_strategy.handle(&mut send_once);
        let raw = spec.request_spec().retry_strategy().retry(&mut attempt)?;

        transport.receive(api_spec, raw)
    }
}

impl<T> Client<T>
where
    T: Transport<Output = FieldMap>,
{
    /// Invokes an operation with typed arguments and a typed result.
    ///
    /// The arguments are serialized to call fields and the merged
    /// response fields are deserialized into `O`. Available on blocking
    /// transports, where the call resolves before returning.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use apiweave::{Client, HttpTransport};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct GetVolume {
    ///     id: String,
    /// }
    ///
    /// #[derive(Deserialize)]
    /// struct Volume {
    ///     id: String,
    ///     title: String,
    /// }
    ///
    /// # fn example(client: &Client<HttpTransport>) -> Result<(), apiweave::Error> {
    /// let volume: Volume = client.call_as("get_volume", &GetVolume { id: "v-1".into() })?;
    /// println!("{}", volume.title);
    /// # Ok(())
    /// # }
    /// ```
    pub fn call_as<A, O>(&self, name: &str, args: &A) -> Result<O>
    where
        A: Serialize,
        O: DeserializeOwned,
    {
        let value = serde_json::to_value(args).map_err(|e| Error::Serialize {
            detail: format!("call arguments did not serialize: {e}"),
        })?;
        let fields = self.call(name, to_fields(value)?)?;
        serde_json::from_value(Value::Object(fields)).map_err(|e| Error::Deserialize {
            detail: format!("response fields did not deserialize: {e}"),
        })
    }
}

/// Builder registering operations for a [`Client`].
pub struct ClientBuilder<T: Transport> {
    transport: T,
    operations: Vec<(String, ClientSpec<T::Raw>)>,
}

impl<T: Transport> ClientBuilder<T> {
    /// Creates a builder with no operations registered.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            operations: Vec::new(),
        }
    }

    /// Registers one operation under a call name.
    pub fn operation(mut self, name: impl Into<String>, spec: ClientSpec<T::Raw>) -> Self {
        self.operations.push((name.into(), spec));
        self
    }

    /// Validates the registrations and creates the client.
    ///
    /// Registering the same name twice is rejected here rather than
    /// silently letting the later registration win.
    pub fn build(self) -> Result<Client<T>> {
        let mut operations = BTreeMap::new();
        for (name, spec) in self.operations {
            if operations.insert(name.clone(), spec).is_some() {
                return Err(Error::Config(format!(
                    "operation {name:?} registered more than once"
                )));
            }
        }
        Ok(Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                operations,
            }),
        })
    }
}
