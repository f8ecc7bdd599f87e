//! Fixed import header prepended to translated files

/// Imports every translated construct may rely on
pub const IMPORT_HEADER: &str = "\
import pandas as pd
import numpy as np
import os
import re
from datetime import datetime, timedelta

";

/// Prepend [`IMPORT_HEADER`] to translated text
pub fn with_header(body: &str) -> String {
    let mut text = String::with_capacity(IMPORT_HEADER.len() + body.len());
    text.push_str(IMPORT_HEADER);
    text.push_str(body);
    text
}
