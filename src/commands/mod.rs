/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `login`    -- Sign in through the browser and print the identity
- `discover` -- Print the provider's discovery document

The handlers wire library components together from configuration and
render the results for the terminal.
*/

pub mod discover;
pub mod login;
