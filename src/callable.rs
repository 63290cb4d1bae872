use log::debug;

use crate::{
    ClobClient, Error,
    conversion::{convert, decimal_text_to_i128},
    handles::{CallExecutor, ClobId, LobSession, SqlType, StorageError},
    parameter::{ParameterMetadata, ParameterMode, ParameterNameMap, ParameterRef},
    value::{Date, Time, Timestamp, Value, describe},
};

/// A prepared call of a stored procedure or function.
///
/// Parameters are addressed either by their one based ordinal or by their declared name. Values
/// are converted into the declared type of the parameter when they are set, and into the
/// requested type when they are read.
///
/// ```
/// use engine_driver::{
///     CallableStatement, ParameterMetadata, ParameterMode, Value,
///     handles::{CallExecutor, InMemoryLobs, SqlType, StorageError},
/// };
///
/// /// Doubles its first parameter into its second.
/// struct Double;
///
/// impl CallExecutor for Double {
///     fn execute_call(&self, _sql: &str, params: &[Value]) -> Result<Vec<Value>, StorageError> {
///         let Value::Integer(i) = params[0] else { unreachable!() };
///         Ok(vec![params[0].clone(), Value::Integer(2 * i)])
///     }
/// }
///
/// let lobs = InMemoryLobs::new();
/// let metadata = ParameterMetadata::new()
///     .parameter("@in", ParameterMode::In, SqlType::Integer)
///     .parameter("@out", ParameterMode::Out, SqlType::Integer);
/// let mut call = CallableStatement::new(&lobs, "CALL double(?, ?)", metadata);
///
/// call.set_i32("@in", 21)?;
/// call.execute(&Double)?;
///
/// assert_eq!(Some(42), call.get_i32("@out")?);
/// assert_eq!(Some(42), call.get_i32(2u16)?);
/// # Ok::<(), engine_driver::Error>(())
/// ```
#[derive(Debug)]
pub struct CallableStatement<'s, S> {
    session: &'s S,
    sql: String,
    metadata: ParameterMetadata,
    /// Current value of each parameter, in ordinal order.
    values: Vec<Value>,
    /// `true` for each parameter a value has been set for since the last call to
    /// `clear_parameters`.
    is_set: Vec<bool>,
    /// Types registered for reading output parameters.
    out_types: Vec<Option<SqlType>>,
    names: ParameterNameMap,
    was_null: bool,
    closed: bool,
}

impl<'s, S> CallableStatement<'s, S>
where
    S: LobSession,
{
    pub fn new(session: &'s S, sql: impl Into<String>, metadata: ParameterMetadata) -> Self {
        let names = ParameterNameMap::new(metadata.labels());
        let num_params = metadata.len();
        Self {
            session,
            sql: sql.into(),
            metadata,
            values: vec![Value::Null; num_params],
            is_set: vec![false; num_params],
            out_types: vec![None; num_params],
            names,
            was_null: false,
            closed: false,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_metadata(&self) -> &ParameterMetadata {
        &self.metadata
    }

    /// One based ordinal of the parameter. Fails with [`Error::ParameterNotFound`] for unknown
    /// names and [`Error::OutOfRange`] for ordinals without a parameter.
    pub fn find_parameter_index<'a>(
        &self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<u16, Error> {
        self.ensure_open()?;
        match parameter.into() {
            ParameterRef::Name(name) => self.names.resolve(name),
            ParameterRef::Ordinal(ordinal) => {
                if ordinal == 0 || usize::from(ordinal) > self.metadata.len() {
                    Err(Error::out_of_range("parameter index", ordinal))
                } else {
                    Ok(ordinal)
                }
            }
        }
    }

    /// Sets the value of an `IN` or `INOUT` parameter, converting it into the declared type.
    pub fn set_value<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: impl Into<Value>,
    ) -> Result<(), Error> {
        let ordinal = self.input_index(parameter)?;
        let target = self.declared_type(ordinal);
        let value = value.into();
        let source = value.natural_type().unwrap_or(target);
        let value = convert(source, target, value)?;
        self.store(ordinal, value);
        Ok(())
    }

    pub fn set_null<'a>(&mut self, parameter: impl Into<ParameterRef<'a>>) -> Result<(), Error> {
        self.set_value(parameter, Value::Null)
    }

    pub fn set_string<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: &str,
    ) -> Result<(), Error> {
        self.set_value(parameter, value)
    }

    pub fn set_i32<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: i32,
    ) -> Result<(), Error> {
        self.set_value(parameter, value)
    }

    pub fn set_i64<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: i64,
    ) -> Result<(), Error> {
        self.set_value(parameter, value)
    }

    pub fn set_f64<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: f64,
    ) -> Result<(), Error> {
        self.set_value(parameter, value)
    }

    pub fn set_bool<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: bool,
    ) -> Result<(), Error> {
        self.set_value(parameter, value)
    }

    pub fn set_bytes<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        value: &[u8],
    ) -> Result<(), Error> {
        self.set_value(parameter, Value::Binary(value.to_vec()))
    }

    /// Binds a character large object. If the parameter is declared as `CHAR` or `VARCHAR`, the
    /// content of the object is bound instead.
    pub fn set_clob<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        clob: ClobId,
    ) -> Result<(), Error> {
        let ordinal = self.input_index(parameter)?;
        let target = self.declared_type(ordinal);
        let value = if target.is_text() {
            Value::Text(self.read_clob(clob)?)
        } else {
            convert(SqlType::Clob, target, Value::Clob(clob))?
        };
        self.store(ordinal, value);
        Ok(())
    }

    /// Registers the type the value of an `OUT` or `INOUT` parameter is read as by
    /// [`Self::get_object`].
    pub fn register_out_parameter<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        sql_type: SqlType,
    ) -> Result<(), Error> {
        let ordinal = self.output_index(parameter)?;
        self.out_types[usize::from(ordinal) - 1] = Some(sql_type);
        Ok(())
    }

    /// Resets all parameter values to `NULL` and marks them as not set.
    pub fn clear_parameters(&mut self) -> Result<(), Error> {
        self.ensure_open()?;
        self.values.iter_mut().for_each(|value| *value = Value::Null);
        self.is_set.iter_mut().for_each(|is_set| *is_set = false);
        Ok(())
    }

    /// Executes the call. All `IN` and `INOUT` parameters must have been set. Afterwards the
    /// values of the `OUT` and `INOUT` parameters are available through the getters.
    pub fn execute(&mut self, executor: &impl CallExecutor) -> Result<(), Error> {
        self.ensure_open()?;
        for (index, description) in self.metadata.iter().enumerate() {
            let needs_value = matches!(description.mode, ParameterMode::In | ParameterMode::InOut);
            if needs_value && !self.is_set[index] {
                return Err(Error::ParameterNotSet {
                    index: ordinal_of(index),
                });
            }
        }
        let response = executor.execute_call(&self.sql, &self.values)?;
        if response.len() != self.values.len() {
            return Err(Error::Storage(StorageError::new(
                0,
                format!(
                    "Call response holds {} parameter values, but the statement declares {}.",
                    response.len(),
                    self.values.len()
                ),
            )));
        }
        let parameters = self.values.iter_mut().zip(self.metadata.iter());
        for ((slot, description), value) in parameters.zip(response) {
            if description.mode.provides_output() {
                *slot = value;
            }
        }
        debug!("Executed call '{}'.", self.sql);
        Ok(())
    }

    /// Value of an `OUT` or `INOUT` parameter, converted into the registered type if there is one.
    pub fn get_object<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Value, Error> {
        let ordinal = self.output_index(parameter)?;
        let index = usize::from(ordinal) - 1;
        let value = self.values[index].clone();
        self.was_null = value.is_null();
        match self.out_types[index] {
            Some(target) => {
                let source = value.natural_type().unwrap_or(target);
                convert(source, target, value)
            }
            None => Ok(value),
        }
    }

    /// Type the value of the parameter is delivered in by [`Self::get_object`]. This is the
    /// registered type, or the declared type if none has been registered.
    pub fn get_in_type<'a>(
        &self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<SqlType, Error> {
        let ordinal = self.find_parameter_index(parameter)?;
        let registered = self.out_types[usize::from(ordinal) - 1];
        Ok(registered.unwrap_or_else(|| self.declared_type(ordinal)))
    }

    /// Text representation of the value. The content of character large objects is read.
    pub fn get_string<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<String>, Error> {
        let ordinal = self.output_index(parameter)?;
        let value = self.values[usize::from(ordinal) - 1].clone();
        self.was_null = value.is_null();
        match value {
            Value::Null => Ok(None),
            Value::Clob(clob) => self.read_clob(clob).map(Some),
            other => match self.convert_read(other, SqlType::Varchar)? {
                Value::Text(text) => Ok(Some(text)),
                other => Err(unexpected(SqlType::Varchar, other)),
            },
        }
    }

    pub fn get_i32<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<i32>, Error> {
        match self.get_as(parameter, SqlType::Integer)? {
            None => Ok(None),
            Some(Value::Integer(i)) => i32::try_from(i)
                .map(Some)
                .map_err(|_| Error::NumericOutOfRange {
                    to: SqlType::Integer,
                    value: i.to_string(),
                }),
            Some(other) => Err(unexpected(SqlType::Integer, other)),
        }
    }

    pub fn get_i64<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<i64>, Error> {
        match self.get_as(parameter, SqlType::BigInt)? {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(i)),
            Some(other) => Err(unexpected(SqlType::BigInt, other)),
        }
    }

    pub fn get_f64<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<f64>, Error> {
        match self.get_as(parameter, SqlType::Double)? {
            None => Ok(None),
            Some(Value::Double(d)) => Ok(Some(d)),
            Some(other) => Err(unexpected(SqlType::Double, other)),
        }
    }

    pub fn get_bool<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<bool>, Error> {
        match self.get_as(parameter, SqlType::Boolean)? {
            None => Ok(None),
            Some(Value::Boolean(flag)) => Ok(Some(flag)),
            Some(other) => Err(unexpected(SqlType::Boolean, other)),
        }
    }

    pub fn get_bytes<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<Vec<u8>>, Error> {
        match self.get_as(parameter, SqlType::Varbinary)? {
            None => Ok(None),
            Some(Value::Binary(bytes)) => Ok(Some(bytes)),
            Some(other) => Err(unexpected(SqlType::Varbinary, other)),
        }
    }

    pub fn get_date<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<Date>, Error> {
        match self.get_as(parameter, SqlType::Date)? {
            None => Ok(None),
            Some(Value::Date(date)) => Ok(Some(date)),
            Some(other) => Err(unexpected(SqlType::Date, other)),
        }
    }

    pub fn get_time<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<Time>, Error> {
        match self.get_as(parameter, SqlType::Time)? {
            None => Ok(None),
            Some(Value::Time(time)) => Ok(Some(time)),
            Some(other) => Err(unexpected(SqlType::Time, other)),
        }
    }

    pub fn get_timestamp<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<Timestamp>, Error> {
        match self.get_as(parameter, SqlType::Timestamp)? {
            None => Ok(None),
            Some(Value::Timestamp(timestamp)) => Ok(Some(timestamp)),
            Some(other) => Err(unexpected(SqlType::Timestamp, other)),
        }
    }

    /// Exact numeric value times 10 to the power of `scale`. E.g. `12.34` with scale 3 is returned
    /// as `12340`. Fraction digits beyond `scale` are truncated.
    pub fn get_decimal_scaled<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        scale: u8,
    ) -> Result<Option<i128>, Error> {
        let target = SqlType::Decimal {
            precision: 0,
            scale,
        };
        match self.get_as(parameter, target)? {
            None => Ok(None),
            Some(Value::Decimal(text)) => decimal_text_to_i128(text.as_bytes(), scale.into())
                .map(Some)
                .ok_or(Error::NumericOutOfRange { to: target, value: text }),
            Some(other) => Err(unexpected(target, other)),
        }
    }

    /// Character large object held by the parameter.
    pub fn get_clob<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
    ) -> Result<Option<ClobClient<'s, S>>, Error> {
        match self.get_as(parameter, SqlType::Clob)? {
            None => Ok(None),
            Some(Value::Clob(clob)) => Ok(Some(ClobClient::new(self.session, clob))),
            Some(other) => Err(unexpected(SqlType::Clob, other)),
        }
    }

    /// `true` if the last value read by any of the getters has been `NULL`.
    pub fn was_null(&self) -> Result<bool, Error> {
        self.ensure_open()?;
        Ok(self.was_null)
    }

    /// Closes the statement. Afterwards every operation fails with [`Error::StatementClosed`],
    /// including lookups of parameter names which have been valid before. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.names.close();
        self.values = Vec::new();
        self.is_set = Vec::new();
        debug!("Closed call '{}'.", self.sql);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed {
            Err(Error::StatementClosed)
        } else {
            Ok(())
        }
    }

    fn declared_type(&self, ordinal: u16) -> SqlType {
        self.metadata.sql_type(ordinal).unwrap_or_default()
    }

    fn mode(&self, ordinal: u16) -> ParameterMode {
        self.metadata.mode(ordinal).unwrap_or_default()
    }

    /// Index of a parameter which may be set.
    fn input_index<'a>(&self, parameter: impl Into<ParameterRef<'a>>) -> Result<u16, Error> {
        let ordinal = self.find_parameter_index(parameter)?;
        let mode = self.mode(ordinal);
        if !mode.accepts_input() {
            return Err(Error::WrongParameterMode {
                index: ordinal,
                mode,
                expected: "IN or INOUT",
            });
        }
        Ok(ordinal)
    }

    /// Index of a parameter which may be read.
    fn output_index<'a>(&self, parameter: impl Into<ParameterRef<'a>>) -> Result<u16, Error> {
        let ordinal = self.find_parameter_index(parameter)?;
        let mode = self.mode(ordinal);
        if !mode.provides_output() {
            return Err(Error::WrongParameterMode {
                index: ordinal,
                mode,
                expected: "OUT or INOUT",
            });
        }
        Ok(ordinal)
    }

    fn store(&mut self, ordinal: u16, value: Value) {
        let index = usize::from(ordinal) - 1;
        self.values[index] = value;
        self.is_set[index] = true;
    }

    /// Value of an output parameter converted into `target`. `None` for `NULL`.
    fn get_as<'a>(
        &mut self,
        parameter: impl Into<ParameterRef<'a>>,
        target: SqlType,
    ) -> Result<Option<Value>, Error> {
        let ordinal = self.output_index(parameter)?;
        let value = self.values[usize::from(ordinal) - 1].clone();
        self.was_null = value.is_null();
        if value.is_null() {
            return Ok(None);
        }
        self.convert_read(value, target).map(Some)
    }

    fn convert_read(&self, value: Value, target: SqlType) -> Result<Value, Error> {
        let source = value.natural_type().unwrap_or(target);
        convert(source, target, value)
    }

    fn read_clob(&self, clob: ClobId) -> Result<String, Error> {
        let clob = ClobClient::new(self.session, clob);
        let length = clob.length()?;
        let length = usize::try_from(length).map_err(|_| Error::out_of_range("length", length))?;
        clob.get_sub_string(1, length)
    }
}

fn ordinal_of(index: usize) -> u16 {
    u16::try_from(index + 1).unwrap_or(u16::MAX)
}

/// A conversion delivered a value of another type than requested.
fn unexpected(target: SqlType, value: Value) -> Error {
    Error::IncompatibleConversion {
        from: value.natural_type().unwrap_or_default(),
        to: target,
        value: describe(&value),
    }
}
