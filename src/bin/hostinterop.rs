use hostinterop::bindings::{hostinterop_custom_entry_point, hostinterop_hello};
use hostinterop::interop::{pass_by_reference, pass_by_value, StringCallbackFn};
use hostinterop::{
    native, BridgeConfig, Boundary, Callback, ComplicatedParamStruct, EncodingChoice, FfiType,
    LibArgs, MarshalError, NativeString, Signature, StringEncoding, StringMarshaller,
};
use std::ffi::c_void;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug)]
struct Config {
    config_path: Option<PathBuf>,
    encoding: Option<EncodingChoice>,
    json: bool,
    verbose: bool,
}

impl Config {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let prog = args.first().map(String::as_str).unwrap_or("hostinterop");

        let mut config = Self {
            config_path: None,
            encoding: None,
            json: false,
            verbose: false,
        };

        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(Self::usage(prog)),
                "--json" => config.json = true,
                "-v" | "--verbose" => config.verbose = true,
                "--config" => {
                    let path = iter.next().ok_or("--config requires a path")?;
                    config.config_path = Some(PathBuf::from(path));
                }
                "--encoding" => {
                    let value = iter.next().ok_or("--encoding requires a value")?;
                    config.encoding = Some(match value.as_str() {
                        "utf8" => EncodingChoice::Utf8,
                        "utf16" => EncodingChoice::Utf16,
                        "platform" => EncodingChoice::Platform,
                        other => return Err(format!("Unknown encoding: {}", other)),
                    });
                }
                opt => return Err(format!("Unknown option: {}\n\n{}", opt, Self::usage(prog))),
            }
        }

        Ok(config)
    }

    fn usage(prog: &str) -> String {
        format!(
            "hostinterop - marshalling boundary demo\n\n\
            USAGE:\n    {} [OPTIONS]\n\n\
            OPTIONS:\n    \
            -h, --help              Print help information\n    \
            --config <path>         Load settings from a TOML file\n    \
            --encoding <name>       utf8, utf16 or platform\n    \
            --json                  Emit JSON logs\n    \
            -v, --verbose           Trace every boundary crossing",
            prog
        )
    }

    fn bridge_config(&self) -> Result<BridgeConfig, String> {
        let mut bridge = match &self.config_path {
            Some(path) => BridgeConfig::load(path)?,
            None => BridgeConfig::discover(),
        };
        if let Some(encoding) = self.encoding {
            bridge.strings.encoding = encoding;
        }
        if self.json {
            bridge.logging.json = true;
        }
        if self.verbose {
            bridge.logging.level = "trace".to_string();
        }
        Ok(bridge)
    }
}

extern "C" fn in_rust_again() {
    println!("[Rust] In Rust again!");
}

extern "C" fn add_quarter(i: i32) -> f64 {
    println!("[Rust] Received {} from native code", i);
    f64::from(i) + 0.25
}

fn run(boundary: &Boundary) -> hostinterop::Result<()> {
    // The entry points decode with the process-wide encoding
    let message = NativeString::new("from host!")?;
    let size = std::mem::size_of::<LibArgs>() as i32;
    for i in 0..3 {
        let args = LibArgs { message: message.as_ptr(), number: i };
        let status = hostinterop_hello(&args as *const LibArgs as *const c_void, size);
        if status != 0 {
            return Err(MarshalError::invalid_argument(format!("hello returned {}", status)));
        }
    }

    let args = LibArgs { message: message.as_ptr(), number: -1 };
    let status = hostinterop_custom_entry_point(args);
    if status != 0 {
        return Err(MarshalError::invalid_argument(format!(
            "custom entry point returned {}",
            status
        )));
    }

    unsafe {
        native::print_simple_message();
        native::print_int(42);
        native::print_float(2.5);
    }

    let mut params = ComplicatedParamStruct::new(11, 43.67, false);
    unsafe {
        native::print_struct_pointer(&params);
        pass_by_value(params, native::print_struct_copy);
        pass_by_reference(&mut params, native::print_struct_reference);
    }

    // `native_log` takes `char const*`, so this crossing is always UTF-8
    let utf8 = Boundary::new(StringEncoding::Utf8);
    utf8.with_native("This string is from c#", |ptr| unsafe {
        native::native_log(ptr.cast())
    })?;

    // `native_log_custom_marshalling` expects the platform encoding
    let platform = Boundary::platform();
    let custom = platform
        .convert_to_unmanaged(Some("This string is from c# - with customized marshalling :D"))?;
    unsafe { native::native_log_custom_marshalling(custom.as_ptr()) };
    platform.free(custom)?;

    let no_args = Callback::<extern "C" fn()>::new(in_rust_again);
    unsafe { native::native_invoke_void(Some(no_args.get())) };

    let with_args = Callback::<extern "C" fn(i32) -> f64>::new(add_quarter);
    let ret = unsafe { native::native_invoke_int_to_double(Some(with_args.get()), 20) };
    info!(ret, "Native code returned");

    let declared = Signature::c(vec![FfiType::I32], FfiType::F64);
    let raw = native::native_add_half as *const c_void;
    let add_half = unsafe { Callback::<extern "C" fn(i32) -> f64>::bind(raw, &declared) }?;
    info!(ret = add_half.invoke(20), "Bound native callback returned");

    let reply_fn = native::string_reply_fn(boundary.encoding());
    let string_signature = Callback::<StringCallbackFn>::string_signature();
    let string_cb = unsafe { Callback::<StringCallbackFn>::bind(reply_fn, &string_signature) }?;
    let reply = string_cb.invoke_with_string(boundary, "String from Rust")?;
    info!(reply = %reply, "String from native code");

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    let bridge = match config.bridge_config() {
        Ok(bridge) => bridge,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::FAILURE;
        }
    };

    let boundary = hostinterop::init(&bridge);

    match run(&boundary) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.status_code(), error = %err, "Demo failed");
            ExitCode::FAILURE
        }
    }
}
